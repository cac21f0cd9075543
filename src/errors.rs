use std::fmt::Display;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LutError
{
    TableNotBuilt,
    LZ4DecompressionFailed,
    ReadBufferFailed,
    WriteBufferFailed,
    SerializationFailed,
    DeserializationFailed,
    FileIOError
}
impl std::error::Error for LutError {}

impl Display for LutError
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", *self)
    }
}
