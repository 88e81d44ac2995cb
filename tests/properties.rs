//! Whole-pipeline behaviour on small inline programs
extern crate c51ast;

use std::path::{Path,PathBuf};
use std::sync::Arc;
use std::thread;

use c51ast::ast::{Node,StatementKind,InterruptAttribute,InterruptVector};
use c51ast::diagnostics::{Category,Reporter};
use c51ast::preproc::{self,DefineTable};
use c51ast::preproc::token::Lexeme;
use c51ast::{Config,Outcome,Status};

fn process(src: &str) -> Outcome
{
	let _ = env_logger::try_init();
	c51ast::process_source(Path::new("prop.c"), src, &Config::default())
}

fn lex(src: &str) -> Vec<Lexeme>
{
	preproc::lex::tokenize(Arc::new(PathBuf::from("prop.c")), src)
		.collect::<Result<Vec<_>,_>>()
		.expect("lex")
}
fn text(lexemes: &[Lexeme]) -> String
{
	lexemes.iter().map(|l| l.token.to_string()).collect::<Vec<_>>().join(" ")
}

/// The expression statement at `idx` in the body of `f`
fn statement_expr(o: &Outcome, idx: usize) -> Node
{
	match o.unit.function("f").expect("f").body[idx].kind
	{
	StatementKind::Expr(ref e) => e.clone(),
	ref k => panic!("{:?}", k),
	}
}

#[test]
fn multiplicative_binds_tighter()
{
	let o = process("int a, b, c, d;\nvoid f(void) {\n a + b * c - d / a;\n a + (b * c) - (d / a);\n (a + b) * c;\n}\n");
	assert!(o.diagnostics.is_empty(), "{:#?}", o.diagnostics);
	let plain = statement_expr(&o, 0);
	assert!(plain.same_shape(&statement_expr(&o, 1)));
	assert!(!plain.same_shape(&statement_expr(&o, 2)));
	assert_ne!(plain.span, statement_expr(&o, 1).span);
}

#[test]
fn dangling_else()
{
	let o = process("int a, b, x, y;\nvoid f(void) {\n if (a) if (b) x; else y;\n}\n");
	assert!(o.diagnostics.is_empty(), "{:#?}", o.diagnostics);
	match o.unit.function("f").expect("f").body[0].kind
	{
	StatementKind::IfStatement { ref true_arm, else_arm: None, .. } => match true_arm[0].kind
		{
		StatementKind::IfStatement { else_arm: Some(ref e), .. } => assert_eq!(e.len(), 1),
		ref k => panic!("inner: {:?}", k),
		},
	ref k => panic!("outer: {:?}", k),
	}
}

#[test]
fn ifdef_without_defines_takes_else()
{
	let mut diag = Reporter::new();
	let toks = lex("#ifdef DEBUG\nint debug_only;\n#else\nint release;\n#endif\n");
	let out = preproc::expand(Arc::new(PathBuf::from("prop.c")), toks, &DefineTable::new(), &mut diag).expect("expand");
	assert_eq!(text(&out), "int release ;");
	assert!(diag.all().is_empty());

	let mut defines = DefineTable::new();
	defines.insert("DEBUG".to_owned(), String::new());
	let toks = lex("#ifdef DEBUG\nint debug_only;\n#else\nint release;\n#endif\n");
	let out = preproc::expand(Arc::new(PathBuf::from("prop.c")), toks, &defines, &mut diag).expect("expand");
	assert_eq!(text(&out), "int debug_only ;");
}

#[test]
fn expansion_is_stable()
{
	let mut defines = DefineTable::new();
	defines.insert("PI".to_owned(), "3.14159".to_owned());
	defines.insert("SQUARE(x)".to_owned(), "((x) * (x))".to_owned());
	let file = Arc::new(PathBuf::from("prop.c"));
	let mut diag = Reporter::new();

	let once = preproc::expand(file.clone(), lex("double area = PI * SQUARE(r + 1);\n"), &defines, &mut diag).expect("expand");
	assert_eq!(text(&once), "double area = 3.14159 * ( ( r + 1 ) * ( r + 1 ) ) ;");
	let twice = preproc::expand(file, once.clone(), &defines, &mut diag).expect("expand");
	assert_eq!(text(&twice), text(&once));
	assert!(diag.all().is_empty(), "{:?}", diag.all());
}

#[test]
fn parse_of_expanded_tokens_matches_source_parse()
{
	let src = "#define N 4\nsfr P1 = 0x90;\nint t[N];\nvoid f(void) { t[0] = N * 2; }\n";
	let mut diag = Reporter::new();
	let tokens = preproc::expand(Arc::new(PathBuf::from("prop.c")), lex(src), &DefineTable::new(), &mut diag).expect("expand");
	let (unit, parse_diag) = c51ast::parse::parse_tokens(Arc::new(PathBuf::from("prop.c")), tokens);
	assert!(parse_diag.all().is_empty(), "{:?}", parse_diag.all());

	let direct = process(src);
	assert_eq!(unit.items.len(), direct.unit.items.len());
	assert_eq!(unit.registers().map(|r| r.address).collect::<Vec<_>>(), vec![0x90]);
	let (a, b) = (unit.function("f").expect("f"), direct.unit.function("f").expect("f"));
	assert_eq!(a.body.len(), b.body.len());
}

#[test]
fn missing_semicolon_is_one_error()
{
	let o = process("void f(void) {\n int a = 1;\n a = 2\n a = 3;\n return;\n}\nint g;\n");
	assert_eq!(o.diagnostics.len(), 1, "{:#?}", o.diagnostics);
	assert_eq!(o.diagnostics[0].category, Category::Syntax);
	assert!(!o.has_fatal());
	assert_eq!(o.status, Status::SuccessWithWarnings);
	let body = &o.unit.function("f").expect("f").body;
	assert_eq!(body.len(), 4);
	assert!(match body[3].kind { StatementKind::Return(None) => true, _ => false });
	assert_eq!(o.unit.variables().count(), 1);
}

#[test]
fn register_address()
{
	let o = process("sfr P1 = 0x90;\n");
	assert!(o.diagnostics.is_empty(), "{:#?}", o.diagnostics);
	let r = o.unit.registers().next().expect("sfr");
	assert_eq!(r.name, "P1");
	assert_eq!(r.address, 144);
}

#[test]
fn interrupt_dialects_agree()
{
	let keil = process("void isr(void) interrupt 1 { }\n");
	let gcc = process("__attribute__((__interrupt__(1))) void isr(void) { }\n");
	assert!(keil.diagnostics.is_empty(), "{:#?}", keil.diagnostics);
	assert!(gcc.diagnostics.is_empty(), "{:#?}", gcc.diagnostics);
	let (k, g) = (&keil.unit.function("isr").expect("isr").decl, &gcc.unit.function("isr").expect("isr").decl);
	assert_eq!(k.interrupt, Some(InterruptAttribute { vector: Some(InterruptVector::Number(1)), register_bank: None }));
	assert_eq!(k.interrupt, g.interrupt);
	assert_eq!(k.sig, g.sig);
	assert_eq!(k.attributes, g.attributes);
	assert_ne!(k.span, g.span);
}

#[test]
fn fatal_error_leaves_partial_unit()
{
	let o = process("int kept;\nint also_kept(void) { return kept; }\n/* never closed\nint lost;\n");
	assert!(o.has_fatal());
	assert_eq!(o.status, Status::Failed);
	assert!(o.unit.is_partial);
	assert_eq!(o.unit.items.len(), 2);
	assert_eq!(o.diagnostics.iter().filter(|d| d.is_fatal).count(), 1);
	assert_eq!(o.diagnostics.last().map(|d| d.category), Some(Category::Lex));
}

#[test]
fn malformed_literal_is_not_fatal()
{
	let o = process("int a = 08;\nint b;\nchar c = '';\nint z;\n");
	assert!(!o.has_fatal(), "{:#?}", o.diagnostics);
	assert!(!o.unit.is_partial);
	assert_eq!(o.status, Status::SuccessWithWarnings);
	let names: Vec<_> = o.unit.variables().map(|v| &v.name[..]).collect();
	assert_eq!(names, vec!["a", "b", "c", "z"]);
	let lex: Vec<_> = o.diagnostics.iter().filter(|d| d.category == Category::Lex).map(|d| d.line).collect();
	assert_eq!(lex, vec![1, 3]);
	assert_eq!(o.diagnostics.len(), 2, "{:#?}", o.diagnostics);
}

#[test]
fn files_are_independent_across_threads()
{
	let sources = [
		"sfr P0 = 0x80;\nvoid main(void) { P0 = 1; }\n",
		"#define N 3\nint t[N];\nint get(int i) { return t[i]; }\n",
		"void f(void) { x = ; }\n",
		"void g(void) {\n",
		];
	let mut config = Config::default();
	config.defines.insert("UNUSED".to_owned(), "1".to_owned());
	let config = &config;

	let sequential: Vec<_> = sources.iter().map(|s| c51ast::process_source(Path::new("t.c"), s, config)).collect();
	let parallel: Vec<Outcome> = thread::scope(|sc| {
		let handles: Vec<_> = sources.iter().map(|s| sc.spawn(move || c51ast::process_source(Path::new("t.c"), s, config))).collect();
		handles.into_iter().map(|h| h.join().expect("worker panicked")).collect()
		});
	for (a, b) in sequential.iter().zip(parallel.iter())
	{
		assert_eq!(a.status, b.status);
		assert_eq!(a.diagnostics, b.diagnostics);
		assert_eq!(a.unit.items, b.unit.items);
	}
	let statuses: Vec<_> = parallel.iter().map(|o| o.status).collect();
	assert_eq!(statuses, vec![Status::Success, Status::Success, Status::SuccessWithWarnings, Status::Failed]);
}
