/// Host facts handed to every operation instead of being read from globals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Report what would change without acting.
    pub dry_run: bool,
    pub is_superuser: bool,
}

impl ExecutionContext {
    pub fn new(dry_run: bool, is_superuser: bool) -> Self {
        Self {
            dry_run,
            is_superuser,
        }
    }
}
