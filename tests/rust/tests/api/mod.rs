//! Backend API client tests with a mock HTTP server

mod end_to_end;
