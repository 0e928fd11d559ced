//! Acceptor script and launch command of the Ansys engine.

use crate::signals::BOOTSTRAP_SCRIPT;
use std::path::Path;

/// APDL loop the engine runs for its whole lifetime.
///
/// Each cycle clears the database, then consumes `model_input_file.dat` if
/// the start signal exists and answers with the finish signal. The loop
/// exits once the terminate signal appears, deleting it on the way out.
pub fn acceptor_script(work_dir: &Path) -> String {
    format!(
        r#"! femflow acceptor loop
! -------------------------------------

/GRA,POWER
/GST,ON
/PLO,INFO,3
/GRO,CURL,ON
/CPLANE,1
/REPLOT,RESIZE
WPSTYLE,,,,,,,,0

/NERR,50000,50000,,OFF,0

/CWD,'{dir}'

/OUTPUT,'ems_signal_ansys_ready','control'
/OUTPUT

:BEGIN

/CLEAR

start_exists = 0
end_exists = 0

/WAIT,0.050

/INQUIRE,start_exists,EXIST,'ems_signal_start','control'
/INQUIRE,end_exists,EXIST,'ems_signal_terminate','control'

*IF,start_exists,EQ,1,THEN
	/DELETE,'ems_signal_start','control'
	/INPUT,'model_input_file','dat',,,1

	SAVE,ALL
	FINISH

	/OUTPUT,'ems_signal_iteration_finish','control'
	/OUTPUT
*ENDIF

*IF,end_exists,EQ,0,:BEGIN

/DELETE,'ems_signal_terminate','control'
"#,
        dir = work_dir.display()
    )
}

/// Arguments that attach the engine to the acceptor script in batch mode.
pub fn launch_args(work_dir: &Path, job_name: &str) -> Vec<String> {
    let bootstrap = work_dir.join(BOOTSTRAP_SCRIPT);
    vec![
        "-s".to_string(),
        "noread".to_string(),
        "-b".to_string(),
        "-j".to_string(),
        job_name.to_string(),
        "-i".to_string(),
        bootstrap.display().to_string(),
        "-o".to_string(),
        format!("{}_out", bootstrap.display()),
    ]
}

/// The launch as one quoted command line, for shell launches.
pub fn launch_command_line(executable: &Path, work_dir: &Path, job_name: &str) -> String {
    let bootstrap = work_dir.join(BOOTSTRAP_SCRIPT);
    format!(
        "\"{exe}\" -s noread -b -j {job_name} -i \"{input}\" -o \"{input}_out\"",
        exe = executable.display(),
        input = bootstrap.display(),
    )
}
