//! The `Unit__c` custom object: the fixed query and the unit type labels.

use serde_json::Value;

pub const UNIT_OBJECT: &str = "Unit__c";

/// Field carrying the unit type code on every record.
pub const UNIT_TYPE_FIELD: &str = "Unit_Type__c";

/// Field added to every record with the human readable unit type.
pub const UNIT_TYPE_LABEL_FIELD: &str = "Unit_Type_Label";

pub const UNITS_SOQL: &str = "SELECT Id, Name, Reference_Number__c, RecordType.Name, \
     Unit_Type__c, Beds__c, Floor__c, Unit_No__c, Built_up_Area__c, Status__c, \
     Price__c, Community__c, Building__r.Name, LastModifiedDate \
     FROM Unit__c ORDER BY LastModifiedDate DESC LIMIT 200";

const UNIT_TYPE_LABELS: &[(&str, &str)] = &[
    ("AP", "Apartment"),
    ("BU", "Bulk Units"),
    ("BW", "Bungalow"),
    ("CD", "Compound"),
    ("DX", "Duplex"),
    ("FF", "Full Floor"),
    ("HF", "Half Floor"),
    ("HA", "Hotel & Hotel Apartment"),
    ("PH", "Penthouse"),
    ("TH", "Townhouse"),
    ("BC", "Business Center"),
    ("CW", "Co-working space"),
    ("FA", "Factory"),
    ("FM", "Farm"),
    ("LC", "Labor Camp"),
];

pub fn unit_type_label(code: &str) -> Option<&'static str> {
    UNIT_TYPE_LABELS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| *label)
}

/// Adds `Unit_Type_Label` to each record. Unknown codes are copied as-is and a
/// missing or null code yields a null label.
pub fn label_unit_types(records: &mut [Value]) {
    for record in records.iter_mut() {
        let Some(fields) = record.as_object_mut() else {
            continue;
        };
        let label = match fields.get(UNIT_TYPE_FIELD) {
            Some(Value::String(code)) => Value::String(
                unit_type_label(code)
                    .map(str::to_string)
                    .unwrap_or_else(|| code.clone()),
            ),
            Some(other) => other.clone(),
            None => Value::Null,
        };
        fields.insert(UNIT_TYPE_LABEL_FIELD.to_string(), label);
    }
}
