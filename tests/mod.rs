mod common;

mod e2e_tests;
mod retry_tests;
