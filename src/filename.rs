use chrono::NaiveDate;

use crate::error::{Error, Result};

/// Timestamp recovered from a window-tagged filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStamp {
    pub date: NaiveDate,
    /// Two-digit calendar month keying the shard, straight from the date digits.
    pub month: String,
}

/// Locate `tag` in `name` and read the 8-digit `YYYYMMDD` date immediately
/// after it. The first occurrence of the tag wins.
///
/// `Ok(None)` means the name carries no tag and the file is skipped without
/// error; a tag that is not followed by a well-formed date is fatal.
pub fn parse_tagged_name(name: &str, tag: &str) -> Result<Option<FileStamp>> {
    let Some(pos) = name.find(tag) else {
        return Ok(None);
    };
    let start = pos + tag.len();
    let digits = name
        .get(start..start + 8)
        .filter(|d| d.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| Error::MalformedFilename { name: name.to_string() })?;
    let date = NaiveDate::parse_from_str(digits, "%Y%m%d")
        .map_err(|_| Error::MalformedFilename { name: name.to_string() })?;
    Ok(Some(FileStamp { date, month: digits[4..6].to_string() }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_name_parses() {
        let stamp = parse_tagged_name("domain_18x1820200715.nc", "18x18")
            .unwrap()
            .unwrap();
        assert_eq!(stamp.date, NaiveDate::from_ymd_opt(2020, 7, 15).unwrap());
        assert_eq!(stamp.month, "07");
    }

    #[test]
    fn untagged_name_is_skipped() {
        assert!(parse_tagged_name("domain_19x1920200715.nc", "18x18")
            .unwrap()
            .is_none());
    }

    #[test]
    fn tag_without_date_is_fatal() {
        assert!(matches!(
            parse_tagged_name("domain_18x18_final.nc", "18x18"),
            Err(Error::MalformedFilename { .. })
        ));
        // too few digits before the extension
        assert!(matches!(
            parse_tagged_name("domain_18x18202007.nc", "18x18"),
            Err(Error::MalformedFilename { .. })
        ));
        // eight digits that are not a calendar date
        assert!(matches!(
            parse_tagged_name("domain_18x1820201399.nc", "18x18"),
            Err(Error::MalformedFilename { .. })
        ));
    }

    #[test]
    fn first_tag_occurrence_wins() {
        let stamp = parse_tagged_name("a18x1820200715_18x18.nc", "18x18")
            .unwrap()
            .unwrap();
        assert_eq!(stamp.month, "07");
        // first occurrence has no date; the later, dated occurrence is ignored
        assert!(matches!(
            parse_tagged_name("a18x18_b18x1820200715.nc", "18x18"),
            Err(Error::MalformedFilename { .. })
        ));
    }
}
