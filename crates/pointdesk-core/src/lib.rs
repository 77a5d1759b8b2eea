pub mod auth;
pub mod desk;
pub mod editor;
pub mod error;
pub mod events;
pub mod forms;
pub mod guard;
pub mod models;
pub mod pdf;
pub mod report;
pub mod storage;

pub use auth::Principal;
pub use desk::Desk;
pub use editor::{Editor, EditorState};
pub use error::{DeskError, StoreError, ValidationErrors};
pub use events::{ChangeNotifier, ChangeType, DataChangedEvent, NoopNotifier};
pub use forms::{
    ClientForm, ContractForm, EmployeeForm, FormContext, FormModel, PointForm, ProcurationForm,
};
pub use guard::{DeleteCheck, DeleteTarget};
pub use models::{
    Client, Contract, ContractStatus, Employee, EntityId, EntityKind, Point, Procuration, Role,
    Stored,
};
pub use pdf::ContractCard;
pub use report::SummaryRow;
pub use storage::{
    ClientRepository, ContractRepository, EmployeeRepository, PointRepository,
    ProcurationRepository, Store, StoreResult,
};
