//! Values stored inline in a DMR++ document.

use crate::{
    array::{extract_constrained, DataType},
    codec::{base64, vlsa, zlib},
    dap::{StringArray, StringPad, Variable, VariableValues},
    error::{dmz_error, DmzError},
    xml::XmlNode,
};

/// Keep the elements of `values` selected by the constraint of `variable`.
///
/// `values` holds every element of the variable, each spanning `element_len` items.
fn constrain<T: Clone>(
    variable: &Variable,
    values: Vec<T>,
    element_len: usize,
) -> Result<Vec<T>, DmzError> {
    if !variable.is_constrained() {
        return Ok(values);
    }
    let constraints = variable.constraints().unwrap_or_default();
    extract_constrained(&values, &variable.shape(), &constraints, element_len)
        .map_err(|err| dmz_error!("Could not subset the variable '{}': {err}", variable.fqn()))
}

fn decode_base64(variable: &Variable, element: XmlNode<'_>) -> Result<Vec<u8>, DmzError> {
    base64::decode(element.text().trim()).map_err(|err| {
        dmz_error!(
            "Could not decode the {} data of the variable '{}': {err}",
            element.local_name(),
            variable.fqn()
        )
    })
}

/// Return the fixed size of each element of the numeric (or enumeration) variable `variable`.
fn numeric_element_size(variable: &Variable, storage: &str) -> Result<usize, DmzError> {
    let element_type = variable.element_type();
    match element_type.fixed_size() {
        Some(size) if element_type.is_numeric() => Ok(size),
        _ => Err(dmz_error!(
            "The variable '{}' of type {} cannot use {storage} storage.",
            variable.fqn(),
            variable.data_type()
        )),
    }
}

/// Return the number of elements of `variable`.
pub(super) fn num_elements(variable: &Variable) -> Result<u64, DmzError> {
    variable.num_elements().ok_or_else(|| {
        dmz_error!("The variable '{}' has too many elements.", variable.fqn())
    })
}

fn expected_bytes(variable: &Variable, element_size: usize) -> Result<usize, DmzError> {
    num_elements(variable)?
        .checked_mul(element_size as u64)
        .and_then(|bytes| usize::try_from(bytes).ok())
        .ok_or_else(|| {
            dmz_error!("The variable '{}' is too large to hold in memory.", variable.fqn())
        })
}

/// Trim the padding from a fixed length string record.
fn trim_padding(record: &[u8], pad: StringPad) -> String {
    let end = record
        .iter()
        .rposition(|&byte| match pad {
            StringPad::Null => byte != 0,
            StringPad::Space => byte != b' ' && byte != 0,
        })
        .map_or(0, |last| last + 1);
    String::from_utf8_lossy(&record[..end]).into_owned()
}

/// Decode the values of a `dmrpp:compact` element.
///
/// Numeric and enumeration values are kept as native bytes. A string array must be a fixed length string array.
pub(super) fn load_compact(variable: &mut Variable, compact: XmlNode<'_>) -> Result<(), DmzError> {
    let data_type = variable.element_type();
    let bytes = decode_base64(variable, compact)?;

    let values = if data_type.is_numeric() {
        let element_size = numeric_element_size(variable, "compact")?;
        let expected = expected_bytes(variable, element_size)?;
        if bytes.len() != expected {
            return Err(dmz_error!(
                "The compact data of the variable '{}' holds {} bytes, expected {expected}.",
                variable.fqn(),
                bytes.len()
            ));
        }
        VariableValues::Bytes(constrain(variable, bytes, element_size)?)
    } else if data_type.is_string() {
        if variable.is_array() {
            let Some(StringArray::FixedLength { length, pad }) = variable.string_array() else {
                return Err(dmz_error!(
                    "The variable length string array '{}' cannot use compact storage.",
                    variable.fqn()
                ));
            };
            let length = usize::try_from(length)
                .map_err(|_| dmz_error!("Invalid string length {length}."))?;
            let expected = expected_bytes(variable, length)?;
            if bytes.len() < expected {
                return Err(dmz_error!(
                    "The compact data of the variable '{}' holds {} bytes, expected {expected}.",
                    variable.fqn(),
                    bytes.len()
                ));
            }
            let strings = bytes[..expected]
                .chunks_exact(length)
                .map(|record| trim_padding(record, pad))
                .collect();
            VariableValues::Strings(constrain(variable, strings, 1)?)
        } else {
            VariableValues::Strings(vec![trim_padding(&bytes, StringPad::Null)])
        }
    } else {
        return Err(dmz_error!(
            "The variable '{}' of type {} cannot use compact storage.",
            variable.fqn(),
            variable.data_type()
        ));
    };

    variable.set_values(values);
    Ok(())
}

/// Decode the values of a `dmrpp:missingdata` element, a zlib compressed copy of the whole array.
pub(super) fn load_missing_data(
    variable: &mut Variable,
    missing_data: XmlNode<'_>,
) -> Result<(), DmzError> {
    let element_size = numeric_element_size(variable, "missing data")?;
    let expected = expected_bytes(variable, element_size)?;
    let decoded = decode_base64(variable, missing_data)?;

    let bytes = if variable.data_type() == DataType::Byte && !variable.is_array() {
        decoded
    } else {
        zlib::uncompress(&decoded, expected).map_err(|err| {
            dmz_error!(
                "Could not uncompress the missing data of the variable '{}': {err}",
                variable.fqn()
            )
        })?
    };
    if bytes.len() != expected {
        return Err(dmz_error!(
            "The missing data of the variable '{}' holds {} bytes, expected {expected}.",
            variable.fqn(),
            bytes.len()
        ));
    }

    let bytes = constrain(variable, bytes, element_size)?;
    variable.set_values(VariableValues::Bytes(bytes));
    Ok(())
}

/// Take `len` bytes from `bytes` at `cursor`.
fn take<'b>(bytes: &'b [u8], cursor: &mut usize, len: usize, fqn: &str) -> Result<&'b [u8], DmzError> {
    let taken = cursor
        .checked_add(len)
        .and_then(|end| bytes.get(*cursor..end))
        .ok_or_else(|| dmz_error!("The special structure data of the variable '{fqn}' is truncated."))?;
    *cursor += len;
    Ok(taken)
}

/// Take a `;` terminated, base64 encoded string from `bytes` at `cursor`.
fn take_string(bytes: &[u8], cursor: &mut usize, fqn: &str) -> Result<String, DmzError> {
    let rest = bytes.get(*cursor..).unwrap_or_default();
    let end = rest.iter().position(|&byte| byte == b';').ok_or_else(|| {
        dmz_error!("The special structure data of the variable '{fqn}' has an unterminated string.")
    })?;
    let encoded = std::str::from_utf8(&rest[..end])
        .map_err(|_| dmz_error!("The special structure data of the variable '{fqn}' has an invalid string."))?;
    let decoded = base64::decode(encoded).map_err(|err| {
        dmz_error!("Could not decode a string of the variable '{fqn}': {err}")
    })?;
    *cursor += end + 1;
    Ok(String::from_utf8_lossy(&decoded).into_owned())
}

/// Decode the records of a `dmrpp:specialstructuredata` element.
///
/// Each record holds the members in declaration order.
/// A numeric member is stored as native bytes. A string member is base64 encoded and terminated by `;`.
pub(super) fn load_special_structure_data(
    variable: &mut Variable,
    special: XmlNode<'_>,
) -> Result<(), DmzError> {
    let fqn = variable.fqn().to_string();
    if variable.data_type() != DataType::Structure {
        return Err(dmz_error!(
            "The variable '{fqn}' of type {} cannot use special structure data storage.",
            variable.data_type()
        ));
    }
    if variable.is_constrained() {
        return Err(dmz_error!(
            "Subsetting the variable '{fqn}' is not supported for special structure data storage."
        ));
    }
    if let Some(member) = variable
        .members()
        .iter()
        .find(|member| !member.data_type().is_simple())
    {
        return Err(dmz_error!(
            "The member '{}' of type {} cannot be held in special structure data.",
            member.fqn(),
            member.data_type()
        ));
    }

    let bytes = decode_base64(variable, special)?;
    let mut cursor = 0;
    let mut records = Vec::new();
    for _ in 0..num_elements(variable)? {
        let mut record = Vec::with_capacity(variable.members().len());
        for member in variable.members() {
            let count = num_elements(member)?;
            let values = match member.data_type().fixed_size() {
                Some(size) => {
                    let len = count
                        .checked_mul(size as u64)
                        .and_then(|len| usize::try_from(len).ok())
                        .ok_or_else(|| {
                            dmz_error!("The member '{}' is too large to hold in memory.", member.fqn())
                        })?;
                    VariableValues::Bytes(take(&bytes, &mut cursor, len, &fqn)?.to_vec())
                }
                None => VariableValues::Strings(
                    (0..count)
                        .map(|_| take_string(&bytes, &mut cursor, &fqn))
                        .collect::<Result<_, _>>()?,
                ),
            };
            record.push(values);
        }
        records.push(record);
    }
    if cursor != bytes.len() {
        tracing::warn!(
            variable = %fqn,
            unused = bytes.len() - cursor,
            "special structure data has trailing bytes"
        );
    }

    variable.set_values(VariableValues::Structures(records));
    Ok(())
}

/// Decode the values of a `dmrpp:vlsa` element.
pub(super) fn load_vlsa(variable: &mut Variable, element: XmlNode<'_>) -> Result<(), DmzError> {
    if !variable.data_type().is_string() {
        return Err(dmz_error!(
            "The variable '{}' of type {} cannot use variable length string array storage.",
            variable.fqn(),
            variable.data_type()
        ));
    }
    let values = vlsa::read(element).map_err(|err| {
        dmz_error!(
            "Could not read the variable length strings of the variable '{}': {err}",
            variable.fqn()
        )
    })?;
    let expected = num_elements(variable)?;
    if values.len() as u64 != expected {
        return Err(dmz_error!(
            "The variable '{}' holds {expected} elements but its variable length string array holds {} values.",
            variable.fqn(),
            values.len()
        ));
    }

    let values = constrain(variable, values, 1)?;
    variable.set_string_array(StringArray::VariableLength);
    variable.set_values(VariableValues::Strings(values));
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{
        dap::{Dmr, StorageClass},
        dmz::DmzDocument,
    };

    use super::*;

    fn loaded(xml: &str, fqn: &str, constraint: Option<(usize, u64, u64, u64)>) -> Result<Variable, DmzError> {
        let document = DmzDocument::new_from_str(xml)?;
        let mut dmr = Dmr::default();
        document.build_thin_dmr(&mut dmr)?;
        let variable = dmr.root_mut().find_variable_mut(fqn).unwrap();
        if let Some((dimension, start, stride, stop)) = constraint {
            variable.set_constraint(dimension, start, stride, stop)?;
        }
        document.load_chunks(variable)?;
        Ok(variable.clone())
    }

    fn dataset(variable: &str) -> String {
        format!(r#"<Dataset name="d" dmrpp:href="d.h5">{variable}</Dataset>"#)
    }

    #[test]
    fn compact_numeric() {
        let bytes: Vec<u8> = [1i16, -2, 3, 4].iter().flat_map(|v| v.to_ne_bytes()).collect();
        let xml = dataset(&format!(
            r#"<Int16 name="v"><Dim size="4"/><dmrpp:compact>{}</dmrpp:compact></Int16>"#,
            base64::encode(&bytes)
        ));
        let variable = loaded(&xml, "/v", None).unwrap();
        assert_eq!(variable.dmrpp().storage_class(), Some(StorageClass::Compact));
        assert_eq!(variable.values(), Some(&VariableValues::Bytes(bytes.clone())));

        let variable = loaded(&xml, "/v", Some((0, 1, 2, 3))).unwrap();
        let expected: Vec<u8> = [-2i16, 4].iter().flat_map(|v| v.to_ne_bytes()).collect();
        assert_eq!(variable.values(), Some(&VariableValues::Bytes(expected)));
    }

    #[test]
    fn compact_strings() {
        let xml = dataset(&format!(
            r#"<String name="s"><Dim size="3"/><dmrpp:FixedLengthStringArray string_length="4" pad="space"/><dmrpp:compact>{}</dmrpp:compact></String>"#,
            base64::encode(b"ab  cdefg   ")
        ));
        let variable = loaded(&xml, "/s", None).unwrap();
        assert_eq!(
            variable.values(),
            Some(&VariableValues::Strings(vec!["ab".into(), "cdef".into(), "g".into()]))
        );

        let xml = dataset(&format!(
            r#"<String name="s"><dmrpp:compact>{}</dmrpp:compact></String>"#,
            base64::encode(b"hello\0\0")
        ));
        let variable = loaded(&xml, "/s", None).unwrap();
        assert_eq!(
            variable.values(),
            Some(&VariableValues::Strings(vec!["hello".into()]))
        );

        let xml = dataset(&format!(
            r#"<String name="s"><Dim size="1"/><dmrpp:compact>{}</dmrpp:compact></String>"#,
            base64::encode(b"abc")
        ));
        assert!(loaded(&xml, "/s", None)
            .unwrap_err()
            .message()
            .contains("variable length string array"));
    }

    #[test]
    fn compact_errors() {
        let xml = dataset(r#"<Int32 name="v"><Dim size="2"/><dmrpp:compact>AAAA</dmrpp:compact></Int32>"#);
        assert!(loaded(&xml, "/v", None).unwrap_err().message().contains("expected 8"));
        let xml = dataset(r#"<Int32 name="v"><dmrpp:compact>A</dmrpp:compact></Int32>"#);
        assert!(loaded(&xml, "/v", None).is_err());
        let xml = dataset(r#"<Structure name="v"><Int32 name="m"/><dmrpp:compact>AAAAAA==</dmrpp:compact></Structure>"#);
        assert!(loaded(&xml, "/v", None).unwrap_err().message().contains("cannot use compact"));
    }

    #[test]
    fn inline_sizes_overflow() {
        let xml = dataset(
            r#"<Int32 name="v"><Dim size="4294967296"/><Dim size="4294967296"/><dmrpp:compact>AAAA</dmrpp:compact></Int32>"#,
        );
        assert!(loaded(&xml, "/v", None).unwrap_err().message().contains("too many elements"));

        let xml = dataset(
            r#"<Int32 name="v"><Dim size="4294967296"/><Dim size="1073741824"/><dmrpp:missingdata>AAAA</dmrpp:missingdata></Int32>"#,
        );
        assert!(loaded(&xml, "/v", None).unwrap_err().message().contains("too large"));
    }

    #[test]
    fn missing_data() {
        let bytes: Vec<u8> = (0..6u32).flat_map(u32::to_ne_bytes).collect();
        let encoded = base64::encode(&zlib::compress(&bytes).unwrap());
        let xml = dataset(&format!(
            r#"<UInt32 name="v"><Dim size="2"/><Dim size="3"/><dmrpp:missingdata>{encoded}</dmrpp:missingdata></UInt32>"#
        ));
        let variable = loaded(&xml, "/v", None).unwrap();
        assert_eq!(variable.dmrpp().storage_class(), Some(StorageClass::MissingData));
        assert_eq!(variable.values(), Some(&VariableValues::Bytes(bytes)));

        let variable = loaded(&xml, "/v", Some((1, 2, 1, 2))).unwrap();
        let expected: Vec<u8> = [2u32, 5].iter().flat_map(|v| v.to_ne_bytes()).collect();
        assert_eq!(variable.values(), Some(&VariableValues::Bytes(expected)));

        let xml = dataset(&format!(
            r#"<Byte name="b"><dmrpp:missingdata>{}</dmrpp:missingdata></Byte>"#,
            base64::encode(&[42])
        ));
        let variable = loaded(&xml, "/b", None).unwrap();
        assert_eq!(variable.values(), Some(&VariableValues::Bytes(vec![42])));
    }

    #[test]
    fn missing_data_errors() {
        let encoded = base64::encode(&zlib::compress(&[0; 4]).unwrap());
        let xml = dataset(&format!(
            r#"<Int32 name="v"><Dim size="2"/><dmrpp:missingdata>{encoded}</dmrpp:missingdata></Int32>"#
        ));
        assert!(loaded(&xml, "/v", None).unwrap_err().message().contains("Could not uncompress"));

        let xml = dataset(&format!(
            r#"<String name="v"><dmrpp:missingdata>{encoded}</dmrpp:missingdata></String>"#
        ));
        assert!(loaded(&xml, "/v", None).unwrap_err().message().contains("cannot use missing data"));
    }

    #[test]
    fn special_structure_data() {
        let mut bytes = Vec::new();
        for (i, label) in [(1i32, "first"), (2, "second")] {
            bytes.extend_from_slice(&i.to_ne_bytes());
            bytes.extend_from_slice(&(f64::from(i) / 2.0).to_ne_bytes());
            bytes.extend_from_slice(&(f64::from(i) * 2.0).to_ne_bytes());
            bytes.extend_from_slice(base64::encode(label.as_bytes()).as_bytes());
            bytes.push(b';');
        }
        let xml = dataset(&format!(
            r#"<Structure name="s"><Dim size="2"/>
                <Int32 name="i"/>
                <Float64 name="f"><Dim size="2"/></Float64>
                <String name="label"/>
                <dmrpp:specialstructuredata>{}</dmrpp:specialstructuredata>
            </Structure>"#,
            base64::encode(&bytes)
        ));
        let variable = loaded(&xml, "/s", None).unwrap();
        let Some(VariableValues::Structures(records)) = variable.values() else {
            panic!("expected structure records");
        };
        assert_eq!(records.len(), 2);
        assert_eq!(records[1][0], VariableValues::Bytes(2i32.to_ne_bytes().to_vec()));
        let floats: Vec<u8> = [0.5f64, 2.0].iter().flat_map(|v| v.to_ne_bytes()).collect();
        assert_eq!(records[0][1], VariableValues::Bytes(floats));
        assert_eq!(records[1][2], VariableValues::Strings(vec!["second".into()]));

        assert!(loaded(&xml, "/s", Some((0, 0, 1, 0)))
            .unwrap_err()
            .message()
            .contains("not supported"));
    }

    #[test]
    fn special_structure_data_errors() {
        let xml = dataset(&format!(
            r#"<Structure name="s"><Int32 name="i"/><dmrpp:specialstructuredata>{}</dmrpp:specialstructuredata></Structure>"#,
            base64::encode(&[0, 0])
        ));
        assert!(loaded(&xml, "/s", None).unwrap_err().message().contains("truncated"));

        let xml = dataset(&format!(
            r#"<Structure name="s"><String name="t"/><dmrpp:specialstructuredata>{}</dmrpp:specialstructuredata></Structure>"#,
            base64::encode(b"YWJj")
        ));
        assert!(loaded(&xml, "/s", None).unwrap_err().message().contains("unterminated"));

        let xml = dataset(
            r#"<Structure name="s"><Structure name="n"><Int32 name="i"/></Structure><dmrpp:specialstructuredata>AAAA</dmrpp:specialstructuredata></Structure>"#,
        );
        assert!(loaded(&xml, "/s", None).unwrap_err().message().contains("cannot be held"));
    }

    #[test]
    fn vlsa_strings() {
        let long = "x".repeat(vlsa::VALUE_COMPRESSION_THRESHOLD + 1);
        let mut writer = quick_xml::Writer::new(Vec::new());
        vlsa::write(&mut writer, &["a", "a", "a", long.as_str(), ""]).unwrap();
        let element = String::from_utf8(writer.into_inner()).unwrap();
        let xml = dataset(&format!(
            r#"<String name="s"><Dim size="5"/>{element}</String>"#
        ));
        let variable = loaded(&xml, "/s", None).unwrap();
        assert_eq!(variable.dmrpp().storage_class(), Some(StorageClass::Vlsa));
        assert_eq!(variable.string_array(), Some(StringArray::VariableLength));
        assert_eq!(
            variable.values(),
            Some(&VariableValues::Strings(vec![
                "a".into(),
                "a".into(),
                "a".into(),
                long.clone(),
                String::new()
            ]))
        );

        let variable = loaded(&xml, "/s", Some((0, 2, 1, 3))).unwrap();
        assert_eq!(
            variable.values(),
            Some(&VariableValues::Strings(vec!["a".into(), long]))
        );

        let xml = dataset(&format!(
            r#"<String name="s"><Dim size="4"/>{element}</String>"#
        ));
        assert!(loaded(&xml, "/s", None).unwrap_err().message().contains("holds 4 elements"));
    }
}
