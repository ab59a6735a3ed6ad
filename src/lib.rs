
pub mod core {
    pub mod config;
    pub mod error;
    pub mod hardware;
    pub mod partition;
    pub mod result;
    pub mod runner;
    pub mod score;
    pub mod session;
}


pub mod workloads;


pub mod reporters;
