pub mod firewalls;
