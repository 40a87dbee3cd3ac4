//! Pure key planning for lifecycle transitions. Keeping these out of the
//! protocol code makes every computed boundary testable without adapters.

/// Object-store location a document's bytes move to when trashed.
pub fn trash_key_for(uid: &str, storage_key: &str) -> String {
    format!("trash/{uid}/{storage_key}")
}

/// Reconstruct the original key from a trash key by stripping the
/// `trash/{uid}/` prefix. Returns `None` when the trash key was not produced
/// by `trash_key_for` for this owner.
pub fn original_key_from_trash(uid: &str, trash_key: &str) -> Option<String> {
    trash_key
        .strip_prefix(&format!("trash/{uid}/"))
        .filter(|rest| !rest.is_empty())
        .map(|rest| rest.to_string())
}

/// Sanitize a user-supplied file name: path separators become `_`, outer
/// whitespace is trimmed. Returns `None` when nothing remains.
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let cleaned: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// New storage key after a rename: same directory component, new file name.
pub fn renamed_key(storage_key: &str, new_name: &str) -> String {
    match storage_key.rsplit_once('/') {
        Some((dir, _)) => format!("{dir}/{new_name}"),
        None => new_name.to_string(),
    }
}
