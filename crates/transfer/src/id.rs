/// Mints a client-side upload identifier: `<unix-millis>-<9 hex chars>`.
///
/// Correlates the init, chunk and complete calls of one transfer.
pub fn new_upload_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{millis}-{}", &suffix[..9])
}
