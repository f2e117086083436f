use paperboy_manifest::DocClass;

/// Infer a document's class from its leading bytes when the manifest
/// has no (or a stale) `file_type` recorded for it.
pub fn sniff_doc_class(bytes: &[u8]) -> DocClass {
    if bytes.starts_with(b"%PDF") {
        return DocClass::Pdf;
    }
    if bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b {
        return DocClass::SourceGzip;
    }
    if bytes.len() >= 262 && &bytes[257..262] == b"ustar" {
        return DocClass::SourceTar;
    }
    DocClass::Unknown
}
