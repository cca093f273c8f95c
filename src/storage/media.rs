use chrono::Utc;
use redb::{ReadableTable, WriteTransaction};

use super::db::{Database, DatabaseError};
use super::models::{MediaRecord, NewMedia};
use super::tables::*;

impl Database {
    // ========================================================================
    // Media operations
    // ========================================================================

    /// Persist a new media record, assigning its id and creation time, and
    /// append it to the post index.
    pub fn create_media(&self, new: NewMedia) -> Result<MediaRecord, DatabaseError> {
        debug_assert!(!new.post_id.is_empty(), "media post_id must not be empty");

        let record = MediaRecord {
            id: uuid::Uuid::new_v4().to_string(),
            post_id: new.post_id,
            created_at: Utc::now(),
            url: new.url,
            media_type: new.media_type,
        };

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(MEDIA)?;
            let data = rmp_serde::to_vec_named(&record)?;
            table.insert(record.id.as_str(), data.as_slice())?;

            let mut post_table = write_txn.open_table(POST_MEDIA)?;
            let mut media_ids: Vec<String> = match post_table.get(record.post_id.as_str())? {
                Some(data) => rmp_serde::from_slice(data.value())?,
                None => Vec::new(),
            };

            media_ids.push(record.id.clone());
            let index_data = rmp_serde::to_vec_named(&media_ids)?;
            post_table.insert(record.post_id.as_str(), index_data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(record)
    }

    /// Get a media record by its UUID
    pub fn get_media(&self, id: &str) -> Result<Option<MediaRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(MEDIA)?;

        match table.get(id)? {
            Some(data) => {
                let media: MediaRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(media))
            }
            None => Ok(None),
        }
    }

    /// All media attached to a post, oldest first. Unknown posts yield an empty list.
    pub fn find_by_post_id(&self, post_id: &str) -> Result<Vec<MediaRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let post_table = read_txn.open_table(POST_MEDIA)?;
        let media_table = read_txn.open_table(MEDIA)?;

        let media_ids: Vec<String> = match post_table.get(post_id)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(Vec::new()),
        };

        let mut media = Vec::with_capacity(media_ids.len());
        for media_id in media_ids {
            if let Some(data) = media_table.get(media_id.as_str())? {
                let record: MediaRecord = rmp_serde::from_slice(data.value())?;
                media.push(record);
            }
        }

        Ok(media)
    }

    /// Delete a media record by its UUID and drop it from the post index.
    /// Returns whether a record was removed; deleting an unknown id is not an error.
    pub fn delete_media(&self, id: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let post_id: Option<String> = {
            let table = write_txn.open_table(MEDIA)?;
            let result = match table.get(id)? {
                Some(data) => {
                    let record: MediaRecord = rmp_serde::from_slice(data.value())?;
                    Some(record.post_id)
                }
                None => None,
            };
            result
        };

        let deleted = match post_id {
            Some(post_id) => {
                {
                    let mut table = write_txn.open_table(MEDIA)?;
                    table.remove(id)?;
                }
                remove_from_post_index(&write_txn, &post_id, id)?;
                true
            }
            None => false,
        };

        write_txn.commit()?;
        Ok(deleted)
    }
}

fn remove_from_post_index(
    write_txn: &WriteTransaction,
    post_id: &str,
    media_id: &str,
) -> Result<(), DatabaseError> {
    let media_ids: Option<Vec<String>> = {
        let post_table = write_txn.open_table(POST_MEDIA)?;
        let result = match post_table.get(post_id)? {
            Some(data) => Some(rmp_serde::from_slice(data.value())?),
            None => None,
        };
        result
    };

    if let Some(mut ids) = media_ids {
        ids.retain(|mid| mid != media_id);
        let mut post_table = write_txn.open_table(POST_MEDIA)?;
        if ids.is_empty() {
            post_table.remove(post_id)?;
        } else {
            let data = rmp_serde::to_vec_named(&ids)?;
            post_table.insert(post_id, data.as_slice())?;
        }
    }

    Ok(())
}
