//! # Cola de Trabajo
//! src/server/queue.rs
//!
//! Cola FIFO thread-safe y sin límite que alimenta a los workers del pool.
//! El límite está en cuántos workers atienden, no en cuántas conexiones se
//! admiten.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Cola FIFO bloqueante
pub struct WorkQueue<T> {
    state: Arc<Mutex<QueueState<T>>>,

    /// Condvar para notificar nuevos items o el cierre
    condvar: Arc<Condvar>,
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
            })),
            condvar: Arc::new(Condvar::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Encola un item
    ///
    /// Si la cola ya está cerrada, devuelve el item en `Err`.
    pub fn enqueue(&self, item: T) -> Result<(), T> {
        let mut state = self.lock();
        if state.closed {
            return Err(item);
        }
        state.items.push_back(item);

        // Notificar a un worker esperando
        self.condvar.notify_one();
        Ok(())
    }

    /// Desencola el item más antiguo
    ///
    /// Bloquea hasta que haya un item. Retorna `None` cuando la cola está
    /// cerrada y vacía.
    pub fn dequeue(&self) -> Option<T> {
        let mut state = self.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            if state.closed {
                return None;
            }
            state = self
                .condvar
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Intenta desencolar sin bloquear
    pub fn try_dequeue(&self) -> Option<T> {
        self.lock().items.pop_front()
    }

    /// No acepta más items; los pendientes se siguen entregando
    pub fn close(&self) {
        self.lock().closed = true;
        self.condvar.notify_all();
    }

    /// Retira todos los items pendientes
    pub fn drain(&self) -> Vec<T> {
        self.lock().items.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            condvar: Arc::clone(&self.condvar),
        }
    }
}
