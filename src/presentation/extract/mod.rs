mod caller;

pub use caller::{Caller, CurrentUser, OptionalCaller, GUEST_ID_HEADER};
