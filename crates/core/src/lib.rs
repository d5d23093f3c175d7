#![forbid(unsafe_code)]

pub mod popularity;
pub mod temporal;

pub mod ids {
    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    pub struct UserId(String);

    impl UserId {
        pub fn as_str(&self) -> &str {
            &self.0
        }

        pub fn try_new(value: impl Into<String>) -> Result<Self, UserIdError> {
            let value = value.into();
            validate_user_id(&value)?;
            Ok(Self(value))
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum UserIdError {
        Empty,
        TooLong,
        InvalidFirstChar,
        InvalidChar { ch: char, index: usize },
    }

    impl std::fmt::Display for UserIdError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::Empty => write!(f, "user id must not be empty"),
                Self::TooLong => write!(f, "user id is too long"),
                Self::InvalidFirstChar => {
                    write!(f, "user id must start with an ascii letter or digit")
                }
                Self::InvalidChar { ch, index } => {
                    write!(f, "user id has invalid char {ch:?} at index {index}")
                }
            }
        }
    }

    impl std::error::Error for UserIdError {}

    fn validate_user_id(value: &str) -> Result<(), UserIdError> {
        if value.is_empty() {
            return Err(UserIdError::Empty);
        }
        if value.len() > 64 {
            return Err(UserIdError::TooLong);
        }
        let mut chars = value.chars();
        let Some(first) = chars.next() else {
            return Err(UserIdError::Empty);
        };
        if !first.is_ascii_alphanumeric() {
            return Err(UserIdError::InvalidFirstChar);
        }
        for (index, ch) in value.chars().enumerate() {
            if index == 0 {
                continue;
            }
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
                continue;
            }
            return Err(UserIdError::InvalidChar { ch, index });
        }
        Ok(())
    }

}
