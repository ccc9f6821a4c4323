//! End-to-end tests: engine, router and client wired together in process.

mod helpers;

mod chat_test;
mod client_test;
mod presence_test;
