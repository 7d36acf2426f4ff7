mod dispatcher;

pub use dispatcher::{SpawnDispatcher, UploadDispatcher, UploadJob};
