use geo::{line_string, BoundingRect, Geometry};
use geo_predicate::{
    encode_geometry_field, Crs, Envelope, IndexBinding, MemoryElementMapper, NamedEnvelope,
    RStarSpatialIndex, SpatialResult,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::backtrace::Backtrace;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tantivy::collector::DocSetCollector;
use tantivy::indexer::NoMergePolicy;
use tantivy::query::Query;
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{Index, IndexWriter, Searcher, TantivyDocument, Term};

const WRITER_MEMORY_BUDGET: usize = 50_000_000;

/// Runs a test between `before` and `after`.
///
/// `after` runs even when the test fails or panics. Failures are reported
/// with the elapsed time and a backtrace, then re-raised as a panic.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> SpatialResult<()>,
    B: Fn() -> SpatialResult<TestContext>,
    A: Fn(TestContext) -> SpatialResult<()>,
{
    let start_time = Instant::now();
    let ctx = match before() {
        Ok(ctx) => ctx,
        Err(e) => panic!("Before run failed: {:?}", e),
    };

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| test(ctx.clone())));
    let after_result = after(ctx);
    let elapsed = start_time.elapsed();

    let failure = match result {
        Ok(Ok(_)) => match after_result {
            Ok(_) => return,
            Err(e) => format!("After run failed: {:?}", e),
        },
        Ok(Err(e)) => format!("Test failed: {:?}", e),
        Err(panic_err) => {
            if let Some(s) = panic_err.downcast_ref::<&str>() {
                format!("Panic: {}", s)
            } else if let Some(s) = panic_err.downcast_ref::<String>() {
                format!("Panic: {}", s)
            } else {
                "Panic: unknown payload".to_string()
            }
        }
    };

    eprintln!("\n==================== TEST FAILED ====================");
    eprintln!("Failed after {:?}", elapsed);
    eprintln!("Error: {}", failure);
    let backtrace = Backtrace::capture().to_string();
    if !backtrace.is_empty() && !backtrace.contains("disabled") {
        eprintln!("\nBacktrace:\n{}", backtrace);
    }
    eprintln!("=====================================================\n");
    panic!("{}", failure);
}

/// What a test record stores in its geometry field.
#[derive(Debug, Clone)]
pub enum StoredGeometry {
    Encoded(Geometry<f64>, Crs),
    Raw(Vec<u8>),
    Missing,
}

#[derive(Debug, Clone)]
pub struct TestRecord {
    pub id: String,
    pub geometry: StoredGeometry,
    pub body: String,
    /// Envelope registered in the spatial index, when it should differ from
    /// the stored geometry's bounding box.
    pub index_envelope: Option<Envelope>,
}

impl TestRecord {
    pub fn new(id: impl Into<String>, geometry: impl Into<Geometry<f64>>) -> Self {
        TestRecord {
            id: id.into(),
            geometry: StoredGeometry::Encoded(geometry.into(), Crs::CARTESIAN),
            body: String::new(),
            index_envelope: None,
        }
    }

    pub fn raw(id: impl Into<String>, bytes: Vec<u8>) -> Self {
        TestRecord {
            id: id.into(),
            geometry: StoredGeometry::Raw(bytes),
            body: String::new(),
            index_envelope: None,
        }
    }

    pub fn without_geometry(id: impl Into<String>) -> Self {
        TestRecord {
            id: id.into(),
            geometry: StoredGeometry::Missing,
            body: String::new(),
            index_envelope: None,
        }
    }

    pub fn with_crs(mut self, crs: Crs) -> Self {
        if let StoredGeometry::Encoded(_, stored_crs) = &mut self.geometry {
            *stored_crs = crs;
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_index_envelope(mut self, envelope: Envelope) -> Self {
        self.index_envelope = Some(envelope);
        self
    }

    fn envelope(&self) -> Option<Envelope> {
        if self.index_envelope.is_some() {
            return self.index_envelope;
        }
        match &self.geometry {
            StoredGeometry::Encoded(geometry, crs) => geometry
                .bounding_rect()
                .map(|rect| Envelope::from_rect(rect, *crs)),
            _ => None,
        }
    }

    fn to_document(&self, fields: &TestFields) -> SpatialResult<TantivyDocument> {
        let mut doc = TantivyDocument::default();
        doc.add_text(fields.id, &self.id);
        doc.add_text(fields.body, &self.body);
        match &self.geometry {
            StoredGeometry::Encoded(geometry, crs) => {
                let bytes = encode_geometry_field(geometry, *crs)?;
                doc.add_bytes(fields.geometry, bytes.as_slice());
            }
            StoredGeometry::Raw(bytes) => doc.add_bytes(fields.geometry, bytes.as_slice()),
            StoredGeometry::Missing => {}
        }
        Ok(doc)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TestFields {
    pub id: Field,
    pub geometry: Field,
    pub body: Field,
}

#[derive(Clone)]
pub struct TestContext {
    path: Option<String>,
    index: Index,
    fields: TestFields,
    records: Vec<TestRecord>,
    deleted: BTreeSet<String>,
}

impl TestContext {
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn schema(&self) -> Schema {
        self.index.schema()
    }

    pub fn fields(&self) -> TestFields {
        self.fields
    }

    pub fn records(&self) -> &[TestRecord] {
        &self.records
    }

    fn writer(&self) -> SpatialResult<IndexWriter> {
        let writer: IndexWriter = self.index.writer_with_num_threads(1, WRITER_MEMORY_BUDGET)?;
        writer.set_merge_policy(Box::new(NoMergePolicy));
        Ok(writer)
    }

    /// Adds `records` in a single commit, producing one new segment.
    pub fn insert(&mut self, records: Vec<TestRecord>) -> SpatialResult<()> {
        let mut writer = self.writer()?;
        for record in &records {
            writer.add_document(record.to_document(&self.fields)?)?;
        }
        writer.commit()?;
        self.records.extend(records);
        Ok(())
    }

    /// Adds each batch in its own commit, so every batch lands in its own
    /// segment.
    pub fn insert_segments(&mut self, batches: Vec<Vec<TestRecord>>) -> SpatialResult<()> {
        for batch in batches {
            self.insert(batch)?;
        }
        Ok(())
    }

    /// Deletes the record with `id` from the index. The record stays
    /// registered in spatial indexes built afterwards.
    pub fn delete(&mut self, id: &str) -> SpatialResult<()> {
        let mut writer = self.writer()?;
        writer.delete_term(Term::from_field_text(self.fields.id, id));
        writer.commit()?;
        self.deleted.insert(id.to_string());
        Ok(())
    }

    pub fn searcher(&self) -> SpatialResult<Searcher> {
        Ok(self.index.reader()?.searcher())
    }

    /// Builds an R-Tree over every record inserted so far.
    pub fn binding(&self, crs: Crs) -> SpatialResult<IndexBinding> {
        let entries = self
            .records
            .iter()
            .filter_map(|record| {
                record
                    .envelope()
                    .map(|envelope| NamedEnvelope::new(record.id.clone(), envelope))
            })
            .collect();
        let mapper = MemoryElementMapper::new(entries);
        let index = RStarSpatialIndex::from_mapper(&mapper, crs)?;
        Ok(IndexBinding::new(Arc::new(index), Arc::new(mapper)))
    }

    /// Record ids of every live document matching `query`.
    pub fn matching_ids(&self, query: &dyn Query) -> SpatialResult<BTreeSet<String>> {
        let searcher = self.searcher()?;
        let addresses = searcher.search(query, &DocSetCollector)?;
        let mut ids = BTreeSet::new();
        for address in addresses {
            let doc: TantivyDocument = searcher.doc(address)?;
            if let Some(id) = doc.get_first(self.fields.id).and_then(|v| v.as_str()) {
                ids.insert(id.to_string());
            }
        }
        Ok(ids)
    }

    /// Record ids of every inserted record, deleted ones included.
    pub fn all_ids(&self) -> BTreeSet<String> {
        self.records.iter().map(|r| r.id.clone()).collect()
    }

    /// Record ids of every inserted record that was not deleted.
    pub fn live_ids(&self) -> BTreeSet<String> {
        self.all_ids().difference(&self.deleted).cloned().collect()
    }
}

pub fn test_schema() -> (Schema, TestFields) {
    let mut builder = Schema::builder();
    let id = builder.add_text_field("id", STRING | STORED);
    let geometry = builder.add_bytes_field("geometry", STORED);
    let body = builder.add_text_field("body", TEXT);
    (builder.build(), TestFields { id, geometry, body })
}

pub fn random_path() -> String {
    let id = uuid::Uuid::new_v4();
    std::env::temp_dir().join(id.to_string()).to_string_lossy().into_owned()
}

#[cfg(not(feature = "mmap"))]
pub fn create_test_context() -> SpatialResult<TestContext> {
    let (schema, fields) = test_schema();
    Ok(TestContext {
        path: None,
        index: Index::create_in_ram(schema),
        fields,
        records: Vec::new(),
        deleted: BTreeSet::new(),
    })
}

#[cfg(feature = "mmap")]
pub fn create_test_context() -> SpatialResult<TestContext> {
    let (schema, fields) = test_schema();
    let path = random_path();
    std::fs::create_dir_all(&path)?;
    let index = Index::create_in_dir(&path, schema)?;
    Ok(TestContext {
        path: Some(path),
        index,
        fields,
        records: Vec::new(),
        deleted: BTreeSet::new(),
    })
}

/// Five records on the diagonal. Record `ri` stores the point
/// `(i + 0.5, i + 0.5)` and is indexed with the envelope `(i, i)-(i + 1, i + 1)`.
/// Records r0..r2 and r3..r4 land in separate segments.
pub fn diagonal_records() -> Vec<TestRecord> {
    (0..5)
        .map(|i| {
            let min = i as f64;
            TestRecord::new(format!("r{}", i), geo::point!(x: min + 0.5, y: min + 0.5))
                .with_index_envelope(Envelope::new(min, min, min + 1.0, min + 1.0, Crs::CARTESIAN))
        })
        .collect()
}

pub fn create_diagonal_context() -> SpatialResult<TestContext> {
    let mut ctx = create_test_context()?;
    let mut records = diagonal_records();
    let tail = records.split_off(3);
    ctx.insert_segments(vec![records, tail])?;
    Ok(ctx)
}

/// Points, short segments and small boxes scattered over `[0, 100]^2`.
pub fn random_records(seed: u64, count: usize) -> Vec<TestRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let x = rng.random_range(0.0..100.0);
            let y = rng.random_range(0.0..100.0);
            let dx = rng.random_range(0.5..5.0);
            let dy = rng.random_range(0.5..5.0);
            let geometry: Geometry<f64> = match i % 3 {
                0 => geo::point!(x: x, y: y).into(),
                1 => line_string![(x: x, y: y), (x: x + dx, y: y + dy)].into(),
                _ => geo::Rect::new((x, y), (x + dx, y + dy)).to_polygon().into(),
            };
            TestRecord::new(format!("rand-{}", i), geometry)
        })
        .collect()
}

/// Ninety random records spread over three segments, with two of them
/// deleted.
pub fn create_random_context() -> SpatialResult<TestContext> {
    let mut ctx = create_test_context()?;
    let mut records = random_records(7, 90);
    let third = records.split_off(60);
    let second = records.split_off(30);
    ctx.insert_segments(vec![records, second, third])?;
    ctx.delete("rand-4")?;
    ctx.delete("rand-45")?;
    Ok(ctx)
}

pub fn random_envelope(rng: &mut StdRng) -> Envelope {
    let x = rng.random_range(0.0..90.0);
    let y = rng.random_range(0.0..90.0);
    let w = rng.random_range(1.0..30.0);
    let h = rng.random_range(1.0..30.0);
    Envelope::new(x, y, x + w, y + h, Crs::CARTESIAN)
}

#[cfg(not(feature = "mmap"))]
pub fn cleanup(ctx: TestContext) -> SpatialResult<()> {
    let mut writer = ctx.writer()?;
    writer.delete_all_documents()?;
    writer.commit()?;
    Ok(())
}

#[cfg(feature = "mmap")]
pub fn cleanup(ctx: TestContext) -> SpatialResult<()> {
    let path = ctx.path().map(str::to_string);
    drop(ctx);
    if let Some(path) = path {
        if let Err(e) = std::fs::remove_dir_all(&path) {
            eprintln!("Warning: Failed to remove test directory {}: {:?}", path, e);
        }
    }
    Ok(())
}

pub fn id_set(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|id| id.to_string()).collect()
}
