use service_abi::{Service, StepCmd, StepRep};
use services_stepper::StepService;

/// Batch step executor driven by the runtime.
pub trait StepExecutor: Service<Cmd = StepCmd, Rep = StepRep> + Send {
    /// Abandons outstanding work; later drains report it as terminated.
    fn shutdown(&mut self);
}

impl StepExecutor for StepService {
    fn shutdown(&mut self) {
        StepService::shutdown(self);
    }
}
