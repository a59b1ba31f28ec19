mod broker;
mod scheduling_interval;
mod utilization;
