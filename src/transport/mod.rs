//! Transport layer: HTTP and wire-format details (serialization/deserialization).

mod twilio;

pub use twilio::{
    decode_error_json_response, decode_message_json_response, encode_message_form,
    messages_path,
};
