use std::io::Read;
use std::path::Path;

use once_cell::sync::Lazy;
use paperboy_manifest::PatentDocType;
use regex::bytes::Regex;

use crate::error::ScanError;
use crate::hash::md5_file;
use crate::mtime_seconds;
use crate::types::{PatentScanEntry, ZipScanOutcome};

const DECL_MARKER: &[u8] = b"<?xml";
const DOC_NUMBER_WINDOW: usize = 4096;
const DOC_TYPE_WINDOW: usize = 2000;

static PUB_REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)<publication-reference\b[^>]*>.*?<doc-number>\s*([A-Z]*\d+)\s*</doc-number>.*?</publication-reference>",
    )
    .unwrap()
});
static KIND_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)<publication-reference\b[^>]*>.*?<kind>\s*([A-Z]\d?)\s*</kind>.*?</publication-reference>",
    )
    .unwrap()
});
static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)<publication-reference\b[^>]*>.*?<date>\s*(\d{4,8})\s*</date>.*?</publication-reference>",
    )
    .unwrap()
});
static GRANT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<us-patent-grant\b").unwrap());
static APP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<us-patent-application\b").unwrap());

/// Open a USPTO bulk `.zip`, read its single inner `.xml` file, and split
/// it into per-patent byte ranges on `<?xml` declaration boundaries.
///
/// A pure function of the bytes at `path`: no database access, safe to
/// call from any worker thread.
pub fn scan_zip_file(path: &Path) -> Result<ZipScanOutcome, ScanError> {
    let file_hash = md5_file(path).map_err(|source| ScanError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mtime = mtime_seconds(path).map_err(|source| ScanError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let file = fs_err::File::open(path).map_err(|source| ScanError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut zip = zip::ZipArchive::new(file).map_err(|source| ScanError::Zip {
        path: path.to_path_buf(),
        source,
    })?;

    let xml_index = (0..zip.len()).find(|&i| {
        zip.by_index(i)
            .map(|entry| entry.name().to_ascii_lowercase().ends_with(".xml"))
            .unwrap_or(false)
    });
    let Some(xml_index) = xml_index else {
        return Err(ScanError::NoInnerDocument {
            path: path.to_path_buf(),
        });
    };

    let mut content = Vec::new();
    {
        let mut xml_file = zip.by_index(xml_index).map_err(|source| ScanError::Zip {
            path: path.to_path_buf(),
            source,
        })?;
        xml_file
            .read_to_end(&mut content)
            .map_err(|source| ScanError::Read {
                path: path.to_path_buf(),
                source,
            })?;
    }

    let boundaries = split_on_declarations(&content);
    let mut entries = Vec::with_capacity(boundaries.len());
    let mut skipped = 0usize;

    for (offset, size) in boundaries {
        let block = &content[offset..offset + size];
        match extract_patent_info(block) {
            Some((id, kind_code, doc_type, year)) => {
                entries.push(PatentScanEntry {
                    id,
                    offset: offset as u64,
                    size: size as u64,
                    doc_type,
                    kind_code,
                    year,
                });
            }
            None => skipped += 1,
        }
    }

    Ok(ZipScanOutcome {
        file_hash,
        mtime,
        entries,
        skipped,
    })
}

/// Byte offsets of every `<?xml` declaration in `content`, paired with
/// the length of the document block it starts (running to the next
/// declaration, or EOF for the last one).
fn split_on_declarations(content: &[u8]) -> Vec<(usize, usize)> {
    let mut boundaries = Vec::new();
    let mut start = 0;
    while let Some(rel) = find_subslice(&content[start..], DECL_MARKER) {
        let pos = start + rel;
        boundaries.push(pos);
        start = pos + DECL_MARKER.len();
    }

    boundaries
        .iter()
        .enumerate()
        .map(|(i, &offset)| {
            let size = boundaries
                .get(i + 1)
                .map(|&next| next - offset)
                .unwrap_or(content.len() - offset);
            (offset, size)
        })
        .collect()
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Parse `(doc_number, kind_code, doc_type, year)` out of one patent's
/// XML block. Only the `<publication-reference>` section is inspected,
/// and only within the first few kilobytes — these documents run to
/// hundreds of kilobytes and the header always comes first.
fn extract_patent_info(
    block: &[u8],
) -> Option<(String, Option<String>, PatentDocType, Option<i32>)> {
    let header = &block[..block.len().min(DOC_TYPE_WINDOW)];
    let doc_type = if GRANT_RE.is_match(header) {
        PatentDocType::Grant
    } else if APP_RE.is_match(header) {
        PatentDocType::Application
    } else {
        PatentDocType::Unknown
    };

    let window = &block[..block.len().min(DOC_NUMBER_WINDOW)];

    let doc_number = PUB_REF_RE
        .captures(window)?
        .get(1)
        .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())?;

    let kind_code = KIND_RE
        .captures(window)
        .and_then(|c| c.get(1))
        .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned());

    let year = DATE_RE
        .captures(window)
        .and_then(|c| c.get(1))
        .and_then(|m| {
            let s = String::from_utf8_lossy(m.as_bytes());
            s.get(0..4).and_then(|y| y.parse::<i32>().ok())
        });

    Some((doc_number, kind_code, doc_type, year))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn grant_block(doc_number: &str, kind: &str) -> Vec<u8> {
        format!(
            "<?xml version=\"1.0\"?>\n<us-patent-grant>\n<publication-reference><document-id><doc-number>{doc_number}</doc-number><kind>{kind}</kind><date>20210105</date></document-id></publication-reference>\n</us-patent-grant>"
        )
        .into_bytes()
    }

    #[test]
    fn splits_two_concatenated_grants() {
        let mut content = grant_block("11123456", "B2");
        content.extend(grant_block("11123457", "B2"));

        let boundaries = split_on_declarations(&content);
        assert_eq!(boundaries.len(), 2);
        assert_eq!(boundaries[0].0, 0);

        let first_block = &content[boundaries[0].0..boundaries[0].0 + boundaries[0].1];
        let (id, kind, doc_type, year) = extract_patent_info(first_block).unwrap();
        assert_eq!(id, "11123456");
        assert_eq!(kind.as_deref(), Some("B2"));
        assert_eq!(doc_type, PatentDocType::Grant);
        assert_eq!(year, Some(2021));
    }

    #[test]
    fn block_with_no_doc_number_is_skipped() {
        let block = b"<?xml version=\"1.0\"?>\n<us-patent-grant>no reference here</us-patent-grant>";
        assert!(extract_patent_info(block).is_none());
    }

    #[test]
    fn scans_a_zip_with_two_patents() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("ipg210105.zip");

        let mut content = grant_block("11123456", "B2");
        content.extend(grant_block("11123457", "B2"));

        let file = fs_err::File::create(&zip_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file("ipg210105.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(&content).unwrap();
        writer.finish().unwrap();

        let result = scan_zip_file(&zip_path).unwrap();
        assert_eq!(result.entries.len(), 2);
        assert_eq!(result.entries[0].id, "11123456");
        assert_eq!(result.entries[1].id, "11123457");
        assert_eq!(result.skipped, 0);
    }

    #[test]
    fn missing_file_is_a_scan_error_not_a_panic() {
        let result = scan_zip_file(Path::new("/nonexistent/ipg210105.zip"));
        assert!(result.is_err());
    }
}
