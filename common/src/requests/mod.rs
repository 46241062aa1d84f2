use serde::Deserialize;

#[derive(Deserialize, Default)]
/// Optional `meta` part sent ahead of the file in an import upload.
/// `declared_size` is the byte size the client saw before sending.
pub struct ImportUploadMeta {
    pub declared_size: Option<u64>,
}

#[derive(Deserialize, Default)]
/// Query string of the target listing endpoint.
pub struct ListTargetsQuery {
    pub department: Option<String>,
}
