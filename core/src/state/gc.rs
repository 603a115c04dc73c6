use std::rc::Rc;

use tracing::trace;

use crate::gc;
use crate::val::Val;

use super::State;

impl State {
    /// Collection threshold in kilobytes.
    pub fn get_threshold(&self) -> usize {
        let _guard = self.enter();
        self.gc.threshold_kb()
    }

    /// Sets the collection threshold in kilobytes and collects right away if
    /// the live estimate already reaches it.
    pub fn set_threshold(&mut self, kb: usize) {
        let _guard = self.enter();
        self.gc.set_threshold_kb(kb);
        self.check_gc();
    }

    /// Tracked allocation volume in kilobytes.
    pub fn get_live_estimate(&self) -> usize {
        let _guard = self.enter();
        self.gc.live_kb()
    }

    /// Completed collection cycles.
    pub fn gc_cycles(&self) -> u64 {
        let _guard = self.enter();
        self.gc.cycles()
    }

    /// Runs a full cycle. Roots are the live stack, the globals table, every
    /// anchored reference and every tag method.
    pub fn collect_garbage(&mut self) {
        let _guard = self.enter();
        let globals = Val::Table(Rc::clone(&self.globals));
        let roots = self.stack[..self.top]
            .iter()
            .chain(std::iter::once(&globals))
            .chain(self.refs.roots());
        let live = gc::collect(&mut self.heap, &mut self.strings, roots.chain(self.tags.methods()));
        self.gc.finish_cycle(live);
        trace!(
            target: "tagvm::gc",
            live_bytes = live,
            threshold = self.gc.threshold_bytes(),
            "gc.cycle"
        );
    }

    /// Collection hook run after allocating operations.
    pub(crate) fn check_gc(&mut self) {
        if self.gc.should_collect() {
            self.collect_garbage();
        }
    }
}
