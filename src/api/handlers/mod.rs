mod health;
mod media;
mod static_files;

pub use health::health;
pub use media::{
    create_media, delete_media, delete_media_for_upload_id, list_media_by_post,
    list_media_for_upload_post, upload_media,
};
pub use media::{CreateMediaRequest, MediaResponse};
pub use static_files::serve_static;
