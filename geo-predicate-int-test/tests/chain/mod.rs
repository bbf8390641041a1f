mod chain_filter_test;
