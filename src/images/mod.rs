pub mod services;

pub use services::{parse_data_uri, store_upload, DataUri, UploadItem};
