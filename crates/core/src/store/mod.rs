//! Repository implementations

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PgRepository;

use crate::models::{Appointment, IcsFile, KycCase, Reminder};
use crate::ports::Entity;
use crate::types::{AppointmentId, IcsFileId, KycCaseId, ReminderId};

impl Entity for Appointment {
    type Id = AppointmentId;
    const COLLECTION: &'static str = "appointments";

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Entity for IcsFile {
    type Id = IcsFileId;
    const COLLECTION: &'static str = "ics_files";

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Entity for Reminder {
    type Id = ReminderId;
    const COLLECTION: &'static str = "reminders";

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Entity for KycCase {
    type Id = KycCaseId;
    const COLLECTION: &'static str = "kyc_cases";

    fn id(&self) -> Self::Id {
        self.id
    }
}
