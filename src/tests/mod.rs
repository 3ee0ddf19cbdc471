mod support;

mod listing_tests;
