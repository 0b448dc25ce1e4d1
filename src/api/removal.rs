// Bin-removal compiler: bin names to a record of removal sentinels.
use serde_json::Value as Json;

use crate::api::descriptor::validate_bin_name;
use crate::core::error::{Error, ErrorKind};
use crate::core::record::Record;
use crate::core::value::json_type_name;

pub fn parse_bin_names(value: &Json) -> Result<Vec<String>, Error> {
    let Json::Array(entries) = value else {
        return Err(Error::new(ErrorKind::Param).with_message(format!(
            "bins must be an array of strings, got {}",
            json_type_name(value)
        )));
    };
    entries
        .iter()
        .map(|entry| match entry {
            Json::String(name) => Ok(name.clone()),
            other => Err(Error::new(ErrorKind::Param).with_message(format!(
                "bin names must be strings, got {}",
                json_type_name(other)
            ))),
        })
        .collect()
}

/// Every listed bin is set to nil; names are validated before anything is built.
pub fn compile_removal(bins: &[String]) -> Result<Record, Error> {
    if bins.is_empty() {
        return Err(Error::new(ErrorKind::Param).with_message("no bins to remove"));
    }
    for bin in bins {
        validate_bin_name(bin)?;
    }
    let mut record = Record::with_capacity(bins.len());
    for bin in bins {
        record.set_nil(bin.as_str());
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::{compile_removal, parse_bin_names};
    use crate::core::value::Value;
    use serde_json::json;

    #[test]
    fn builds_nil_bins() {
        let names = parse_bin_names(&json!(["x", "y"])).expect("names");
        let record = compile_removal(&names).expect("record");
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("x"), Some(&Value::Nil));
        assert_eq!(record.get("y"), Some(&Value::Nil));
    }

    #[test]
    fn rejects_non_string_names_and_empty_sets() {
        assert!(parse_bin_names(&json!(["x", 1])).is_err());
        assert!(parse_bin_names(&json!("x")).is_err());
        assert!(compile_removal(&[]).is_err());
        assert!(compile_removal(&["".to_string()]).is_err());
    }
}
