mod composite_query_test;
