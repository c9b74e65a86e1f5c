#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use wade_runtime::{ModelObject, ObservableSeq, Scheduler, SchedulerConfig, WatchTarget};

#[derive(Debug, Arbitrary)]
enum Op {
    Push(i32),
    Remove(u8),
    Insert(u8, i32),
    Reassign(u8),
    Rewatch,
    Checkpoint,
}

fuzz_target!(|ops: Vec<Op>| {
    let pool: Vec<ObservableSeq> = (0..3).map(|_| ObservableSeq::new()).collect();
    let model = ModelObject::new().with("items", pool[0].clone());
    let mut scheduler = Scheduler::new(SchedulerConfig::default());
    let Ok(_) = scheduler.watch(WatchTarget::field(&model, "items")) else {
        return;
    };
    let mut current = 0usize;

    for op in ops {
        match op {
            Op::Push(v) => pool[current].push(v),
            Op::Remove(i) => {
                pool[current].remove(usize::from(i));
            }
            Op::Insert(i, v) => pool[current].insert(usize::from(i), v),
            Op::Reassign(i) => {
                current = usize::from(i) % pool.len();
                model.set("items", pool[current].clone());
            }
            Op::Rewatch => {
                let _ = scheduler.watch(WatchTarget::field(&model, "items"));
            }
            Op::Checkpoint => {
                scheduler.checkpoint();
            }
        }
        for (i, seq) in pool.iter().enumerate() {
            let expected = usize::from(i == current);
            assert_eq!(seq.observer_count(), expected);
        }
    }
});
