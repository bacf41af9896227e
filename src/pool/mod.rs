/// Pool bring-up, dispatch and tear-down.
pub mod lifecycle;
/// Worker threads and the messages exchanged with them.
pub mod worker;
