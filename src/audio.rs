//! rodio output: a worker thread owning the stream, driven through [`RodioBackend`].

mod player;
mod sink;
mod thread;
mod types;

pub use player::RodioBackend;

#[cfg(test)]
mod tests;
