use crate::cli::PortsArgs;
use crate::exit_codes;
use crate::output;
use serial_analyzer::source::list_ports;

pub fn execute(args: PortsArgs) -> i32 {
    let ports = match list_ports() {
        Ok(ports) => ports,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    };

    if args.json {
        if let Err(e) = output::emit_json(&ports, None, false) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    } else if ports.is_empty() {
        println!("No serial ports found");
    } else {
        println!("{:<24} TYPE", "PORT");
        for port in &ports {
            println!("{:<24} {}", port.name, port.kind);
        }
    }

    exit_codes::SUCCESS
}
