//! A DICOM data set, defined as a map of data element tags to data element
//! values.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{
  DataElementTag, DataElementValue, DataError, DataSetPath, TransferSyntax,
  ValueRepresentation, dictionary, transfer_syntax,
};

/// A DICOM data set that is a mapping of data element tags to data element
/// values. Tag order is the order DICOM mandates on emission, so iteration
/// yields elements in their serialized order.
///
/// A data set is used both for the root of a DICOM object and for the items
/// of sequences, which are nested data sets. Each value is owned by exactly
/// one data set, so deleting an element releases its whole subtree and cycles
/// are unrepresentable.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataSet(BTreeMap<DataElementTag, DataElementValue>);

impl DataSet {
  /// Returns a new empty data set.
  ///
  pub fn new() -> Self {
    Self(BTreeMap::new())
  }

  /// Returns the number of data elements in a data set.
  ///
  pub fn size(&self) -> usize {
    self.0.len()
  }

  /// Returns whether a data set is empty and contains no data elements.
  ///
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Returns whether a data element with the specified tag exists in a data
  /// set.
  ///
  pub fn has(&self, tag: DataElementTag) -> bool {
    self.0.contains_key(&tag)
  }

  /// Inserts a data element tag and value into a data set. If there is
  /// already a value for the tag then it is replaced with the new value.
  ///
  pub fn insert(&mut self, tag: DataElementTag, value: DataElementValue) {
    self.0.insert(tag, value);
  }

  /// Inserts a new binary value into a data set. If there is already a value
  /// for the tag it is replaced with the new value.
  ///
  pub fn insert_binary_value(
    &mut self,
    tag: DataElementTag,
    vr: ValueRepresentation,
    bytes: Vec<u8>,
  ) -> Result<(), DataError> {
    self.insert(tag, DataElementValue::new_binary(vr, bytes)?);

    Ok(())
  }

  /// Inserts a data element with a string value into a data set. The data
  /// element being inserted must be referenced through its dictionary entry,
  /// which determines the VR to use.
  ///
  pub fn insert_string_value(
    &mut self,
    item: &dictionary::Item,
    values: &[&str],
  ) -> Result<(), DataError> {
    if !item.multiplicity.contains(values.len()) {
      return Err(
        DataError::new_multiplicity_mismatch()
          .with_path(&DataSetPath::new_with_data_element(item.tag)),
      );
    }

    let value = DataElementValue::new_string(item.vrs[0], values)?;

    self.0.insert(item.tag, value);

    Ok(())
  }

  /// Inserts a data element with a sequence value into a data set. The data
  /// element being inserted must be referenced through its dictionary entry.
  ///
  pub fn insert_sequence_value(
    &mut self,
    item: &dictionary::Item,
    items: Vec<Self>,
  ) -> Result<(), DataError> {
    match item.vrs {
      [ValueRepresentation::Sequence] => {
        self.0.insert(item.tag, DataElementValue::new_sequence(items));
        Ok(())
      }
      _ => Err(DataError::new_value_invalid(format!(
        "Sequence value is not valid for '{}'",
        dictionary::tag_with_name(item.tag)
      ))),
    }
  }

  /// Deletes a data element from a data set, releasing its subtree.
  ///
  pub fn delete(&mut self, tag: DataElementTag) {
    self.0.remove(&tag);
  }

  /// Merges two data sets together. Data elements from the second data set
  /// take precedence.
  ///
  pub fn merge(&mut self, b: Self) {
    for (tag, value) in b.0.into_iter() {
      self.0.insert(tag, value);
    }
  }

  /// Retains only the data elements for which the predicate returns true.
  ///
  pub fn retain(
    &mut self,
    mut predicate: impl FnMut(DataElementTag, &DataElementValue) -> bool,
  ) {
    self.0.retain(|tag, value| predicate(*tag, value));
  }

  /// Returns the tags in a data set, sorted by group and element.
  ///
  pub fn tags(&self) -> Vec<DataElementTag> {
    self.0.keys().copied().collect()
  }

  /// Returns an iterator over a data set's elements, sorted by tag.
  ///
  pub fn iter(
    &self,
  ) -> std::collections::btree_map::Iter<'_, DataElementTag, DataElementValue>
  {
    self.0.iter()
  }

  /// Returns a mutable iterator over a data set's elements, sorted by tag.
  ///
  pub fn iter_mut(
    &mut self,
  ) -> std::collections::btree_map::IterMut<'_, DataElementTag, DataElementValue>
  {
    self.0.iter_mut()
  }

  /// Returns the data element value for the specified tag in a data set.
  ///
  pub fn get_value(
    &self,
    tag: DataElementTag,
  ) -> Result<&DataElementValue, DataError> {
    match self.0.get(&tag) {
      Some(value) => Ok(value),
      _ => Err(
        DataError::new_tag_not_present()
          .with_path(&DataSetPath::new_with_data_element(tag)),
      ),
    }
  }

  /// Returns the raw value bytes for the specified tag in a data set,
  /// checking that it has the expected VR.
  ///
  pub fn get_value_bytes(
    &self,
    tag: DataElementTag,
    vr: ValueRepresentation,
  ) -> Result<&Arc<Vec<u8>>, DataError> {
    let value = self.get_value(tag)?;

    if value.value_representation() == vr {
      value
        .bytes()
        .map_err(|e| e.with_path(&DataSetPath::new_with_data_element(tag)))
    } else {
      Err(
        DataError::new_value_not_present()
          .with_path(&DataSetPath::new_with_data_element(tag)),
      )
    }
  }

  /// Returns the singular string value for a data element in a data set. If
  /// the data element with the specified tag does not hold exactly one string
  /// value then an error is returned.
  ///
  pub fn get_string(&self, tag: DataElementTag) -> Result<&str, DataError> {
    self
      .get_value(tag)?
      .get_string()
      .map_err(|e| e.with_path(&DataSetPath::new_with_data_element(tag)))
  }

  /// Returns all of the string values for a data element in a data set.
  ///
  pub fn get_strings(
    &self,
    tag: DataElementTag,
  ) -> Result<Vec<&str>, DataError> {
    self
      .get_value(tag)?
      .get_strings()
      .map_err(|e| e.with_path(&DataSetPath::new_with_data_element(tag)))
  }

  /// Returns the singular integer value for a data element in a data set.
  ///
  pub fn get_int(&self, tag: DataElementTag) -> Result<i64, DataError> {
    self
      .get_value(tag)?
      .get_int()
      .map_err(|e| e.with_path(&DataSetPath::new_with_data_element(tag)))
  }

  /// Returns all of the integer values for a data element in a data set.
  ///
  pub fn get_ints(&self, tag: DataElementTag) -> Result<Vec<i64>, DataError> {
    self
      .get_value(tag)?
      .get_ints()
      .map_err(|e| e.with_path(&DataSetPath::new_with_data_element(tag)))
  }

  /// Returns the singular floating point value for a data element in a data
  /// set.
  ///
  pub fn get_float(&self, tag: DataElementTag) -> Result<f64, DataError> {
    self
      .get_value(tag)?
      .get_float()
      .map_err(|e| e.with_path(&DataSetPath::new_with_data_element(tag)))
  }

  /// Returns all of the floating point values for a data element in a data
  /// set.
  ///
  pub fn get_floats(
    &self,
    tag: DataElementTag,
  ) -> Result<Vec<f64>, DataError> {
    self
      .get_value(tag)?
      .get_floats()
      .map_err(|e| e.with_path(&DataSetPath::new_with_data_element(tag)))
  }

  /// Returns a new data set containing this data set's data elements in the
  /// specified group.
  ///
  pub fn group_elements(&self, group: u16) -> DataSet {
    self
      .0
      .range((
        std::ops::Bound::Included(DataElementTag::new(group, 0x0000)),
        std::ops::Bound::Included(DataElementTag::new(group, 0xFFFF)),
      ))
      .map(|(tag, value)| (*tag, value.clone()))
      .collect()
  }

  /// Returns a new data set containing the File Meta Information data
  /// elements in this data set, i.e. those where the data element tag group
  /// equals 2.
  ///
  /// This function also sets the *'(0002,0002) Media Storage SOP Class UID'*
  /// and *'(0002,0003) Media Storage SOP Instance UID'* data elements to
  /// match the *'(0008,0016) SOP Class UID'* and *'(0008,0018) SOP Instance
  /// UID'* data elements in this data set.
  ///
  pub fn file_meta_information(&self) -> DataSet {
    let mut file_meta_information = self.group_elements(0x0002);

    // Exclude any data elements that don't hold a chunk of binary data, i.e.
    // sequences or encapsulated pixel data, as they aren't allowed in File
    // Meta Information
    file_meta_information
      .0
      .retain(|_tag, value| value.bytes().is_ok());

    if let Ok(value) = self.get_value(dictionary::SOP_CLASS_UID.tag) {
      file_meta_information
        .insert(dictionary::MEDIA_STORAGE_SOP_CLASS_UID.tag, value.clone());
    }

    if let Ok(value) = self.get_value(dictionary::SOP_INSTANCE_UID.tag) {
      file_meta_information.insert(
        dictionary::MEDIA_STORAGE_SOP_INSTANCE_UID.tag,
        value.clone(),
      );
    }

    file_meta_information
  }

  /// Removes all private range tags from a data set, including recursively
  /// into any sequences that are present.
  ///
  pub fn delete_private_elements(&mut self) {
    self.0.retain(|tag, value| {
      if tag.is_private() {
        return false;
      }

      if let Ok(items) = value.sequence_items_mut() {
        for item in items.iter_mut() {
          item.delete_private_elements();
        }
      }

      true
    })
  }

  /// Returns the transfer syntax specified by the *'(0002,0010) Transfer
  /// Syntax UID'* data element, defaulting to 'Implicit VR Little Endian'
  /// when the data element is not present.
  ///
  pub fn get_transfer_syntax(
    &self,
  ) -> Result<&'static TransferSyntax, DataError> {
    match self.get_string(dictionary::TRANSFER_SYNTAX_UID.tag) {
      Ok(uid) => TransferSyntax::from_uid(uid).map_err(|_| {
        DataError::new_value_invalid(format!(
          "Unrecognized transfer syntax UID: {uid}"
        ))
      }),

      Err(DataError::TagNotPresent { .. }) => {
        Ok(&transfer_syntax::IMPLICIT_VR_LITTLE_ENDIAN)
      }

      Err(e) => Err(e),
    }
  }

  /// Sets the *'(0002,0010) Transfer Syntax UID'* data element. The given UID
  /// must identify a known transfer syntax; setting any other UID is an
  /// error.
  ///
  /// In-memory values are endian-normalized, so no re-encode of existing
  /// elements happens here; the new byte order takes effect when the data set
  /// is serialized.
  ///
  pub fn set_transfer_syntax(&mut self, uid: &str) -> Result<(), DataError> {
    if TransferSyntax::from_uid(uid).is_err() {
      return Err(DataError::new_value_invalid(format!(
        "'{uid}' is not a transfer syntax UID"
      )));
    }

    self.insert_string_value(&dictionary::TRANSFER_SYNTAX_UID, &[uid])
  }
}

impl FromIterator<(DataElementTag, DataElementValue)> for DataSet {
  fn from_iter<T: IntoIterator<Item = (DataElementTag, DataElementValue)>>(
    iter: T,
  ) -> Self {
    Self(iter.into_iter().collect())
  }
}

impl IntoIterator for DataSet {
  type Item = (DataElementTag, DataElementValue);
  type IntoIter =
    std::collections::btree_map::IntoIter<DataElementTag, DataElementValue>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.into_iter()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn test_data_set() -> DataSet {
    let mut data_set = DataSet::new();

    data_set
      .insert_string_value(&dictionary::PATIENT_NAME, &["Doe^Jane"])
      .unwrap();
    data_set
      .insert_string_value(&dictionary::SOP_CLASS_UID, &["1.2.840.10008.5.1.4.1.1.7"])
      .unwrap();
    data_set
      .insert_string_value(&dictionary::SOP_INSTANCE_UID, &["1.2.3.4"])
      .unwrap();

    data_set
  }

  #[test]
  fn insert_and_get_test() {
    let data_set = test_data_set();

    assert_eq!(data_set.size(), 3);
    assert!(data_set.has(dictionary::PATIENT_NAME.tag));
    assert_eq!(
      data_set.get_string(dictionary::PATIENT_NAME.tag),
      Ok("Doe^Jane")
    );

    assert_eq!(
      data_set.get_string(dictionary::PATIENT_ID.tag),
      Err(
        DataError::new_tag_not_present().with_path(
          &DataSetPath::new_with_data_element(dictionary::PATIENT_ID.tag)
        )
      )
    );
  }

  #[test]
  fn delete_test() {
    let mut data_set = test_data_set();

    data_set.delete(dictionary::PATIENT_NAME.tag);

    assert!(!data_set.has(dictionary::PATIENT_NAME.tag));
    assert_eq!(data_set.size(), 2);
  }

  #[test]
  fn tags_are_ordered_test() {
    let data_set = test_data_set();

    assert_eq!(
      data_set.tags(),
      vec![
        dictionary::SOP_CLASS_UID.tag,
        dictionary::SOP_INSTANCE_UID.tag,
        dictionary::PATIENT_NAME.tag,
      ]
    );
  }

  #[test]
  fn group_elements_test() {
    let data_set = test_data_set();

    let group = data_set.group_elements(0x0008);
    assert_eq!(group.size(), 2);

    let group = data_set.group_elements(0x0010);
    assert_eq!(group.tags(), vec![dictionary::PATIENT_NAME.tag]);
  }

  #[test]
  fn file_meta_information_test() {
    let mut data_set = test_data_set();
    data_set
      .insert_string_value(&dictionary::TRANSFER_SYNTAX_UID, &["1.2.840.10008.1.2.1"])
      .unwrap();

    let fmi = data_set.file_meta_information();

    assert_eq!(
      fmi.get_string(dictionary::MEDIA_STORAGE_SOP_INSTANCE_UID.tag),
      Ok("1.2.3.4")
    );
    assert_eq!(
      fmi.get_string(dictionary::TRANSFER_SYNTAX_UID.tag),
      Ok("1.2.840.10008.1.2.1")
    );
    assert!(!fmi.has(dictionary::PATIENT_NAME.tag));
  }

  #[test]
  fn delete_private_elements_test() {
    let mut item = DataSet::new();
    item
      .insert_string_value(&dictionary::PATIENT_ID, &["1234"])
      .unwrap();
    item.insert(
      DataElementTag::new(0x0009, 0x0002),
      DataElementValue::new_binary(ValueRepresentation::Unknown, vec![1, 2])
        .unwrap(),
    );

    let mut data_set = test_data_set();
    data_set.insert(
      DataElementTag::new(0x0009, 0x0001),
      DataElementValue::new_binary(ValueRepresentation::Unknown, vec![0, 0])
        .unwrap(),
    );
    let referenced_study_sequence = DataElementTag::new(0x0008, 0x1110);
    data_set.insert(
      referenced_study_sequence,
      DataElementValue::new_sequence(vec![item]),
    );

    data_set.delete_private_elements();

    assert!(!data_set.has(DataElementTag::new(0x0009, 0x0001)));

    let items = data_set
      .get_value(referenced_study_sequence)
      .unwrap()
      .sequence_items()
      .unwrap();

    assert!(items[0].has(dictionary::PATIENT_ID.tag));
    assert!(!items[0].has(DataElementTag::new(0x0009, 0x0002)));
  }

  #[test]
  fn transfer_syntax_test() {
    let mut data_set = test_data_set();

    assert_eq!(
      data_set.get_transfer_syntax(),
      Ok(&transfer_syntax::IMPLICIT_VR_LITTLE_ENDIAN)
    );

    data_set.set_transfer_syntax("1.2.840.10008.1.2.2").unwrap();
    assert_eq!(
      data_set.get_transfer_syntax(),
      Ok(&transfer_syntax::EXPLICIT_VR_BIG_ENDIAN)
    );

    assert!(data_set.set_transfer_syntax("1.2.3.4").is_err());
    assert!(
      data_set
        .set_transfer_syntax("1.2.840.10008.5.1.4.1.1.7")
        .is_err()
    );
  }
}
