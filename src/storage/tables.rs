use redb::TableDefinition;

/// Media records: uuid -> MediaRecord (msgpack)
pub const MEDIA: TableDefinition<&str, &[u8]> = TableDefinition::new("media");

/// Post index: post_id -> msgpack Vec of media UUIDs, in creation order
pub const POST_MEDIA: TableDefinition<&str, &[u8]> = TableDefinition::new("post_media");
