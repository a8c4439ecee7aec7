mod client;

pub use client::{
    DEFAULT_APP_TYPE, DEFAULT_PORT, ErrorClass, NOTE_EXTENSION, PackageRequest, ROOT_APP_TYPE,
    ROOT_FOLDER_NAME, RemoteEntry, ViwoodsClient, ViwoodsError, note_file_name,
};
