pub mod duration;

pub mod id;

pub mod net;

pub(crate) mod scoped_timer;
