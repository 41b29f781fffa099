pub mod attendance;
pub mod author;
pub mod book;
pub mod borrowing;
pub mod category;
pub mod customer;
pub mod event;
pub mod fine;
pub mod invoice;
pub mod notice;
pub mod payment;
pub mod plan;
pub mod product;
pub mod school_class;
pub mod student;
pub mod teacher;
pub mod timetable;
pub mod transaction;
pub mod user;

pub use attendance::{AttendanceRecord, AttendanceStatus};
pub use author::Author;
pub use book::Book;
pub use borrowing::{Borrowing, BorrowingStatus};
pub use category::Category;
pub use customer::Customer;
pub use event::Event;
pub use fine::{Fine, FineStatus};
pub use invoice::{Invoice, InvoiceItem, InvoiceStatus};
pub use notice::{Notice, NoticeAudience};
pub use payment::{Payment, PaymentMethod};
pub use plan::{BillingCycle, Plan};
pub use product::Product;
pub use school_class::SchoolClass;
pub use student::Student;
pub use teacher::Teacher;
pub use timetable::TimetableEntry;
pub use transaction::{Transaction, TransactionKind};
pub use user::{ChangePasswordForm, LoginForm, PasswordResetConfirm, User};
