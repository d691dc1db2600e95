use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed reference '{input}': expected {expected}")]
pub struct TupleParseError {
    pub input: String,
    pub expected: &'static str,
}

fn malformed(input: &str, expected: &'static str) -> TupleParseError {
    TupleParseError {
        input: input.to_string(),
        expected,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub object_type: String,
    pub object_id: String,
}

impl ObjectRef {
    pub fn new(object_type: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            object_id: object_id.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.object_type, self.object_id)
    }
}

impl FromStr for ObjectRef {
    type Err = TupleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (object_type, object_id) = s
            .split_once(':')
            .ok_or_else(|| malformed(s, "type:id"))?;
        if object_type.is_empty() || object_id.is_empty() {
            return Err(malformed(s, "type:id"));
        }
        Ok(Self::new(object_type, object_id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubjectRef {
    pub subject_type: String,
    pub subject_id: String,
    pub subject_relation: Option<String>,
}

impl SubjectRef {
    pub fn direct(subject_type: impl Into<String>, subject_id: impl Into<String>) -> Self {
        Self {
            subject_type: subject_type.into(),
            subject_id: subject_id.into(),
            subject_relation: None,
        }
    }

    pub fn userset(
        subject_type: impl Into<String>,
        subject_id: impl Into<String>,
        relation: impl Into<String>,
    ) -> Self {
        Self {
            subject_type: subject_type.into(),
            subject_id: subject_id.into(),
            subject_relation: Some(relation.into()),
        }
    }
}

impl fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.subject_type, self.subject_id)?;
        if let Some(ref rel) = self.subject_relation {
            write!(f, "#{rel}")?;
        }
        Ok(())
    }
}

impl FromStr for SubjectRef {
    type Err = TupleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let expected = "type:id or type:id#relation";
        let (base, relation) = match s.split_once('#') {
            Some((base, relation)) if !relation.is_empty() => (base, Some(relation)),
            Some(_) => return Err(malformed(s, expected)),
            None => (s, None),
        };
        let (subject_type, subject_id) = base
            .split_once(':')
            .ok_or_else(|| malformed(s, expected))?;
        if subject_type.is_empty() || subject_id.is_empty() {
            return Err(malformed(s, expected));
        }
        Ok(Self {
            subject_type: subject_type.to_string(),
            subject_id: subject_id.to_string(),
            subject_relation: relation.map(str::to_string),
        })
    }
}

/// One relationship: `object#relation@subject`, the format scenario files use.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationshipTuple {
    pub object: ObjectRef,
    pub relation: String,
    pub subject: SubjectRef,
}

impl RelationshipTuple {
    pub fn new(object: ObjectRef, relation: impl Into<String>, subject: SubjectRef) -> Self {
        Self {
            object,
            relation: relation.into(),
            subject,
        }
    }
}

impl fmt::Display for RelationshipTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}@{}", self.object, self.relation, self.subject)
    }
}

impl FromStr for RelationshipTuple {
    type Err = TupleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let expected = "object:id#relation@subject:id";
        let (left, subject_raw) = s.split_once('@').ok_or_else(|| malformed(s, expected))?;
        let (object_raw, relation) = left.split_once('#').ok_or_else(|| malformed(s, expected))?;
        if relation.is_empty() {
            return Err(malformed(s, expected));
        }
        let object: ObjectRef = object_raw
            .parse()
            .map_err(|_| malformed(s, expected))?;
        let subject: SubjectRef = subject_raw
            .parse()
            .map_err(|_| malformed(s, expected))?;
        Ok(Self::new(object, relation, subject))
    }
}
