use std::sync::mpsc;

// Unbounded: the adapter's callback thread must never block on a send.
pub type Sender<T> = mpsc::Sender<T>;
pub type Receiver<T> = mpsc::Receiver<T>;

pub fn channel<T>() -> (Sender<T>, Receiver<T>) {
    mpsc::channel()
}
