mod attendances_test;
mod auth_test;
mod payments_test;
