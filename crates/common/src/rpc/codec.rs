//! Bus wire encoding. JSON, not bincode/msgpack: RPC payloads are small and
//! infrequent enough that the debuggability of a readable wire format beats
//! the encoding overhead.

pub fn encode<T: serde::Serialize>(msg: &T) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(msg)
}

pub fn decode<'de, T: serde::Deserialize<'de>>(msg: &'de [u8]) -> serde_json::Result<T> {
    serde_json::from_slice(msg)
}
