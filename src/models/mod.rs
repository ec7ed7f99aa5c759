pub mod equipment;
pub mod rental;
pub mod return_record;
pub mod stock_allocation;
