// handlers/protected/students/mod.rs - Student collection handlers
//
// All routes sit behind the bearer token middleware.

pub mod list;     // GET /api/students
pub mod show;     // GET /api/students/:id
pub mod create;   // POST /api/students
pub mod update;   // PUT /api/students/:id
pub mod delete;   // DELETE /api/students/:id

pub use create::student_create;
pub use delete::student_delete;
pub use list::student_list;
pub use show::student_show;
pub use update::student_update;
