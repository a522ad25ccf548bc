#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    String(String),
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::String(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::String(s)
    }
}

pub type BoxResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync + 'static>>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[macro_export]
macro_rules! error_gen {
    ($fmt:literal) => {
        $crate::error::Error::from(format!($fmt))
    };
    ($e:expr) => {
        $crate::error::Error::from($e)
    };
    ($fmt:literal, $($arg:tt)+) => {
        $crate::error::Error::from(format!($fmt, $($arg)+))
    };
}
