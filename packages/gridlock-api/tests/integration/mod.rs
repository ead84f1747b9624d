//! End-to-end tests: a live grid server driven through `HttpBackend`.

mod helpers;
mod remote_tests;
