use crate::doc_key::decode::HybridTimeRequired;
use crate::doc_key::sub_doc_key::SubDocKey;
use crate::types::to_debug_hex_string;

/// Render key bytes read from storage as readably as possible.
///
/// Decodes as much of a sub-document key as the bytes allow. A key without
/// subkeys or hybrid time is shown as a bare doc key, undecodable trailing bytes
/// are appended in hex, and bytes that don't start with a doc key at all are
/// shown entirely in hex.
pub fn best_effort_doc_db_key_to_str(bytes: &[u8]) -> String {
    let mut input = bytes;
    let mut key = SubDocKey::default();
    if key
        .decode_from(&mut input, HybridTimeRequired::NotRequired)
        .is_err()
    {
        return to_debug_hex_string(bytes);
    }

    let mut out = if !key.has_hybrid_time() && key.num_subkeys() == 0 {
        key.doc_key().to_string()
    } else {
        key.to_string()
    };
    if !input.is_empty() {
        out.push_str(" followed by raw bytes ");
        out.push_str(&to_debug_hex_string(input));
    }
    out
}
