mod cas_semantics;
mod key_watch;
