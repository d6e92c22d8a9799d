// Predicate library. Each submodule holds one kind of pipeline entry; the
// variants pick from them when assembling a `Pipeline`.

pub mod final_checks;
pub mod harmonic;
pub mod melodic;
pub mod rhythmic;
pub mod state;
