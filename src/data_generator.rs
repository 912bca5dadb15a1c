//! Random record generation for the bundled table schemas.

use rand::Rng;

use crate::record::{Field, FieldType, FieldValue, Record, TableSchema};

const FIRST_NAMES: &[&str] = &[
    "Ada", "Edsger", "Grace", "Alan", "Barbara", "Donald", "Niklaus", "Tony", "Radia", "Leslie",
];

const SURNAMES: &[&str] = &[
    "Lovelace", "Dijkstra", "Hopper", "Turing", "Liskov", "Knuth", "Wirth", "Hoare", "Perlman",
    "Lamport",
];

const CITIES: &[&str] = &[
    "Athens", "London", "Zurich", "Pittsburgh", "Cambridge", "Eindhoven", "Stanford", "Oslo",
];

/// Schema of the employee table: integer key, three text columns, a float.
pub fn employee_schema() -> TableSchema {
    TableSchema::new(vec![
        Field {
            name: "id".into(),
            ty: FieldType::Int,
        },
        Field {
            name: "name".into(),
            ty: FieldType::Text(20),
        },
        Field {
            name: "surname".into(),
            ty: FieldType::Text(20),
        },
        Field {
            name: "city".into(),
            ty: FieldType::Text(20),
        },
        Field {
            name: "salary".into(),
            ty: FieldType::Float,
        },
    ])
    .expect("employee schema is well formed")
}

/// Schema of the student table: integer key, two text columns, a float.
pub fn student_schema() -> TableSchema {
    TableSchema::new(vec![
        Field {
            name: "id".into(),
            ty: FieldType::Int,
        },
        Field {
            name: "name".into(),
            ty: FieldType::Text(20),
        },
        Field {
            name: "surname".into(),
            ty: FieldType::Text(20),
        },
        Field {
            name: "average".into(),
            ty: FieldType::Float,
        },
    ])
    .expect("student schema is well formed")
}

/// Generates random records for any schema; the caller supplies the key so
/// key uniqueness stays under its control.
pub struct RecordGenerator {
    rng: rand::rngs::ThreadRng,
}

impl RecordGenerator {
    /// A generator seeded from the thread-local RNG.
    pub fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Builds a record of `schema` with `key` in the key field and random
    /// values everywhere else.
    pub fn random_record(&mut self, schema: &TableSchema, key: i64) -> Record {
        let mut values = Vec::with_capacity(schema.fields().len());
        for (i, field) in schema.fields().iter().enumerate() {
            let value = if i == 0 {
                FieldValue::Int(key)
            } else {
                match field.ty {
                    FieldType::Int => FieldValue::Int(self.rng.gen_range(0..1_000_000)),
                    FieldType::Float => {
                        FieldValue::Float((self.rng.gen_range(0.0..10_000.0f64) * 100.0).round() / 100.0)
                    }
                    FieldType::Text(len) => FieldValue::Text(self.random_text(&field.name, len)),
                }
            };
            values.push(value);
        }
        Record::new(values)
    }

    fn random_text(&mut self, field_name: &str, len: u8) -> String {
        let pool = match field_name {
            "surname" => SURNAMES,
            "city" => CITIES,
            _ => FIRST_NAMES,
        };
        let mut text = pool[self.rng.gen_range(0..pool.len())].to_string();
        text.truncate(len as usize);
        text
    }
}

impl Default for RecordGenerator {
    fn default() -> Self {
        Self::new()
    }
}
