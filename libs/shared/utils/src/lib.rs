pub mod cloud_error;
pub mod credentials;
pub mod extractor;
pub mod test_utils;
